//! Session hub
//!
//! A single coordinator task owns the set of live sessions. Registration,
//! unregistration, broadcasts and snapshot requests reach it over channels,
//! so membership changes are serialized without locks.

mod callbacks;
mod coordinator;

pub use callbacks::{HubCallbacks, SessionCallback};

use crate::config::WsConfig;
use crate::connection::{outbound_queue, OutboundReceiver, Session};
use crate::handlers::Dispatcher;
use crate::protocol::{Envelope, FrameKind};
use bytes::Bytes;
use coordinator::Coordinator;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::future::Future;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Capacity of the register, unregister and broadcast queues
const CONTROL_QUEUE_SIZE: usize = 64;

/// State shared between hub handles and the coordinator
pub(crate) struct HubShared {
    config: WsConfig,
    dispatcher: Dispatcher,
    callbacks: HubCallbacks,
    session_count: AtomicUsize,
    writers: TaskTracker,
}

/// Clonable handle to a running hub
#[derive(Clone)]
pub struct Hub {
    register: mpsc::Sender<Session>,
    unregister: mpsc::Sender<Session>,
    broadcast: mpsc::Sender<Envelope>,
    snapshot: mpsc::Sender<oneshot::Sender<Vec<Session>>>,
    shared: Arc<HubShared>,
    shutdown: CancellationToken,
    stopped: CancellationToken,
}

impl Hub {
    /// Spawn the coordinator task and return a handle to it
    pub fn spawn(config: WsConfig, dispatcher: Dispatcher, callbacks: HubCallbacks) -> Self {
        let (register_tx, register_rx) = mpsc::channel(CONTROL_QUEUE_SIZE);
        let (unregister_tx, unregister_rx) = mpsc::channel(CONTROL_QUEUE_SIZE);
        let (broadcast_tx, broadcast_rx) = mpsc::channel(CONTROL_QUEUE_SIZE);
        let (snapshot_tx, snapshot_rx) = mpsc::channel(CONTROL_QUEUE_SIZE);
        let shutdown = CancellationToken::new();
        let stopped = CancellationToken::new();

        let shared = Arc::new(HubShared {
            config,
            dispatcher,
            callbacks,
            session_count: AtomicUsize::new(0),
            writers: TaskTracker::new(),
        });

        let coordinator = Coordinator::new(
            shared.clone(),
            register_rx,
            unregister_rx,
            broadcast_rx,
            snapshot_rx,
            shutdown.clone(),
        );
        let done = stopped.clone();
        tokio::spawn(async move {
            coordinator.run().await;
            done.cancel();
        });

        tracing::debug!("Hub started");

        Self {
            register: register_tx,
            unregister: unregister_tx,
            broadcast: broadcast_tx,
            snapshot: snapshot_tx,
            shared,
            shutdown,
            stopped,
        }
    }

    pub fn config(&self) -> &WsConfig {
        &self.shared.config
    }

    pub(crate) fn dispatcher(&self) -> &Dispatcher {
        &self.shared.dispatcher
    }

    /// Build a session bound to this hub, with its outbound queue
    pub(crate) fn new_session(&self, peer_addr: Option<SocketAddr>) -> (Session, OutboundReceiver) {
        let (tx, rx) = outbound_queue(self.shared.config.send_buffer);
        (Session::new(peer_addr, tx, self.unregister.clone()), rx)
    }

    /// Spawn a session writer that `stop` waits for
    pub(crate) fn spawn_writer<F>(&self, writer: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.shared.writers.spawn(writer);
    }

    /// Add a session to the live set
    ///
    /// Returns `false` when the hub has stopped; the session is closed.
    pub async fn register(&self, session: Session) -> bool {
        if self.shutdown.is_cancelled() {
            session.close_outbound();
            return false;
        }

        match self.register.send(session).await {
            Ok(()) => true,
            Err(mpsc::error::SendError(session)) => {
                session.close_outbound();
                false
            }
        }
    }

    /// Remove a session from the live set
    ///
    /// Unknown or already removed sessions are ignored. When the hub has
    /// stopped the session's queue is closed directly.
    pub async fn unregister(&self, session: &Session) {
        if self.unregister.send(session.clone()).await.is_err() {
            session.close_outbound();
        }
    }

    /// Queue an envelope for every live session
    pub async fn broadcast(&self, envelope: Envelope) {
        if self.broadcast.send(envelope).await.is_err() {
            tracing::warn!("Hub stopped, dropping broadcast");
        }
    }

    pub async fn broadcast_text(&self, text: impl Into<String>) {
        self.broadcast(Envelope::text(text)).await;
    }

    pub async fn broadcast_binary(&self, data: impl Into<Bytes>) {
        self.broadcast(Envelope::binary(data)).await;
    }

    pub async fn broadcast_kind(&self, kind: FrameKind, payload: impl Into<Bytes>) {
        self.broadcast(Envelope::new(kind, payload)).await;
    }

    /// Point-in-time copy of the live sessions
    pub async fn sessions(&self) -> Vec<Session> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.snapshot.send(reply_tx).await.is_err() {
            return Vec::new();
        }
        reply_rx.await.unwrap_or_default()
    }

    /// Number of live sessions as last published by the coordinator
    pub fn session_count(&self) -> usize {
        self.shared.session_count.load(Ordering::Acquire)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.is_cancelled()
    }

    /// Drain every session, then stop the coordinator
    ///
    /// Each live session is unregistered (its peer gets a close frame), and
    /// the call returns once the set is empty, the coordinator has exited
    /// and every session writer has finished. Sessions that register while
    /// draining are swept on the next poll.
    pub async fn stop(&self) {
        if self.shutdown.is_cancelled() {
            self.stopped.cancelled().await;
            self.shared.writers.wait().await;
            return;
        }

        let poll_interval = self.shared.config.drain_poll_interval;
        let mut sessions = self.sessions().await;

        while !sessions.is_empty() && !self.is_stopped() {
            for session in &sessions {
                tracing::debug!(session_id = %session.id(), "Unregistering session");
                self.unregister(session).await;
            }

            sessions = self.sessions().await;
            if !sessions.is_empty() {
                tracing::info!(count = sessions.len(), "Hub is draining sessions");
                tokio::time::sleep(poll_interval).await;
                sessions = self.sessions().await;
            }
        }

        self.shutdown.cancel();
        self.stopped.cancelled().await;

        // Buffered frames and close frames are still being written
        self.shared.writers.close();
        self.shared.writers.wait().await;
        tracing::info!("Hub stopped");
    }
}
