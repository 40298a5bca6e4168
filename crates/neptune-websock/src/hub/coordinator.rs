//! Hub coordinator task

use super::HubShared;
use crate::connection::{EnqueueError, Session};
use crate::protocol::Envelope;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Owner of the live session set
pub(super) struct Coordinator {
    shared: Arc<HubShared>,
    sessions: HashMap<Uuid, Session>,
    register_rx: mpsc::Receiver<Session>,
    unregister_rx: mpsc::Receiver<Session>,
    broadcast_rx: mpsc::Receiver<Envelope>,
    snapshot_rx: mpsc::Receiver<oneshot::Sender<Vec<Session>>>,
    shutdown: CancellationToken,
}

impl Coordinator {
    pub(super) fn new(
        shared: Arc<HubShared>,
        register_rx: mpsc::Receiver<Session>,
        unregister_rx: mpsc::Receiver<Session>,
        broadcast_rx: mpsc::Receiver<Envelope>,
        snapshot_rx: mpsc::Receiver<oneshot::Sender<Vec<Session>>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            shared,
            sessions: HashMap::new(),
            register_rx,
            unregister_rx,
            broadcast_rx,
            snapshot_rx,
            shutdown,
        }
    }

    pub(super) async fn run(mut self) {
        // Registration is polled first so a session is always in the set
        // before its own unregister request is seen.
        loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                Some(session) = self.register_rx.recv() => self.register(session),
                Some(session) = self.unregister_rx.recv() => {
                    self.remove(session.id());
                }
                Some(envelope) = self.broadcast_rx.recv() => self.broadcast(&envelope),
                Some(reply) = self.snapshot_rx.recv() => {
                    let _ = reply.send(self.sessions.values().cloned().collect());
                }
                else => break,
            }
        }

        // Anything still registered does not outlive the hub
        let remaining: Vec<Uuid> = self.sessions.keys().copied().collect();
        for id in remaining {
            self.remove(id);
        }

        self.register_rx.close();
        while let Ok(session) = self.register_rx.try_recv() {
            session.close_outbound();
        }
    }

    fn register(&mut self, session: Session) {
        tracing::debug!(session_id = %session.id(), "Session registered");
        self.sessions.insert(session.id(), session.clone());
        self.publish_count();
        self.shared.callbacks.connected(&session);
    }

    /// Remove a session, firing the disconnect callback exactly once
    fn remove(&mut self, id: Uuid) -> bool {
        let Some(session) = self.sessions.get(&id).cloned() else {
            return false;
        };

        self.shared.callbacks.disconnected(&session);
        self.sessions.remove(&id);
        session.close_outbound();
        self.publish_count();

        tracing::debug!(session_id = %id, "Session unregistered");
        true
    }

    fn broadcast(&mut self, envelope: &Envelope) {
        let mut dropped = Vec::new();

        for (id, session) in &self.sessions {
            match session.try_enqueue(envelope.clone()) {
                Ok(()) => {}
                Err(EnqueueError::Full(_)) => {
                    tracing::warn!(session_id = %id, "Outbound queue full, dropping session");
                    dropped.push(*id);
                }
                Err(EnqueueError::Closed(_)) => {
                    tracing::debug!(session_id = %id, "Outbound queue closed, dropping session");
                    dropped.push(*id);
                }
            }
        }

        for id in dropped {
            self.remove(id);
        }
    }

    fn publish_count(&self) {
        self.shared
            .session_count
            .store(self.sessions.len(), Ordering::Release);
    }
}
