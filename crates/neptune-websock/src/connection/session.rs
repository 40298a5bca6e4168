//! Session handle
//!
//! A `Session` is the hub-side view of one connected peer. It is a cheap
//! clone over shared state; handlers receive one per inbound message.

use super::queue::{EnqueueError, OutboundSender};
use crate::protocol::{Envelope, FrameKind};
use bytes::Bytes;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Handle to one connected peer
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    id: Uuid,
    peer_addr: Option<SocketAddr>,
    outbound: OutboundSender,
    unregister: mpsc::Sender<Session>,
    user_context: OnceLock<Box<dyn Any + Send + Sync>>,
}

impl Session {
    pub(crate) fn new(
        peer_addr: Option<SocketAddr>,
        outbound: OutboundSender,
        unregister: mpsc::Sender<Session>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id: Uuid::new_v4(),
                peer_addr,
                outbound,
                unregister,
                user_context: OnceLock::new(),
            }),
        }
    }

    /// Unique session ID
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Remote address, when the transport exposes one
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.inner.peer_addr
    }

    /// Queue a frame for this peer
    ///
    /// Waits while the queue is full. Once the session is closed the frame
    /// is dropped with a warning.
    pub async fn send(&self, kind: FrameKind, payload: impl Into<Bytes>) {
        self.send_envelope(Envelope::new(kind, payload)).await;
    }

    pub async fn send_text(&self, text: impl Into<String>) {
        self.send_envelope(Envelope::text(text)).await;
    }

    pub async fn send_binary(&self, data: impl Into<Bytes>) {
        self.send_envelope(Envelope::binary(data)).await;
    }

    /// Serialize a value and queue it as a text frame
    pub async fn send_json<T: Serialize + ?Sized>(&self, value: &T) {
        match Envelope::json(value) {
            Ok(envelope) => self.send_envelope(envelope).await,
            Err(e) => {
                tracing::warn!(session_id = %self.id(), error = %e, "Failed to encode outbound message");
            }
        }
    }

    pub async fn send_envelope(&self, envelope: Envelope) {
        if let Err(e) = self.inner.outbound.send(envelope).await {
            let envelope = e.into_inner();
            tracing::warn!(
                session_id = %self.id(),
                kind = %envelope.kind(),
                len = envelope.len(),
                "Session closed, dropping outbound message"
            );
        }
    }

    /// Ask the hub to remove this session
    ///
    /// Falls back to closing the outbound queue directly when the hub is
    /// already gone.
    pub async fn close(&self) {
        if self.inner.unregister.send(self.clone()).await.is_err() {
            self.close_outbound();
        }
    }

    /// Whether the outbound queue has been closed
    pub fn is_closed(&self) -> bool {
        self.inner.outbound.is_closed()
    }

    /// Attach application state to this session; only the first call wins
    pub fn set_user_context<T: Any + Send + Sync>(&self, context: T) -> bool {
        self.inner.user_context.set(Box::new(context)).is_ok()
    }

    /// Application state previously attached with `set_user_context`
    pub fn user_context<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.inner.user_context.get()?.downcast_ref::<T>()
    }

    pub(crate) fn try_enqueue(&self, envelope: Envelope) -> Result<(), EnqueueError> {
        self.inner.outbound.try_send(envelope)
    }

    pub(crate) fn close_outbound(&self) {
        self.inner.outbound.close();
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Session {}

impl Hash for Session {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("peer_addr", &self.inner.peer_addr)
            .field("closed", &self.is_closed())
            .finish()
    }
}
