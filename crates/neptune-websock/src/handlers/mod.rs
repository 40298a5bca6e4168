//! Inbound message handlers
//!
//! Routes decoded frames from a session's reader to application code.
//! Text frames that parse as a [`WsMessage`] whose header `id` names a
//! registered protocol go to that protocol's handler; everything else goes
//! to the plain text or binary handler.

mod error;

pub use error::{HandlerError, HandlerResult};

use crate::connection::Session;
use crate::protocol::{Envelope, FrameKind, WsMessage};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by handlers
pub type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

type TextHandler = Arc<dyn Fn(Session, String) -> HandlerFuture + Send + Sync>;
type BinaryHandler = Arc<dyn Fn(Session, Bytes) -> HandlerFuture + Send + Sync>;
type ProtocolHandler =
    Arc<dyn Fn(Session, WsMessage<Value>) -> HandlerResult<HandlerFuture> + Send + Sync>;

/// Handler table shared by every session of a hub
#[derive(Clone, Default)]
pub struct Dispatcher {
    text: Option<TextHandler>,
    binary: Option<BinaryHandler>,
    protocols: HashMap<String, ProtocolHandler>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle text frames, already flattened onto one line
    pub fn on_text<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Session, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.text = Some(Arc::new(move |session, text| -> HandlerFuture {
            Box::pin(handler(session, text))
        }));
        self
    }

    /// Handle binary frames
    pub fn on_binary<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Session, Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.binary = Some(Arc::new(move |session, data| -> HandlerFuture {
            Box::pin(handler(session, data))
        }));
        self
    }

    /// Handle structured messages whose header `id` equals `protocol_id`
    ///
    /// The body is decoded into `T` before the handler runs. Registering the
    /// same id twice replaces the earlier handler.
    pub fn on_protocol<T, F, Fut>(mut self, protocol_id: impl Into<String>, handler: F) -> Self
    where
        T: DeserializeOwned + Send + 'static,
        F: Fn(Session, WsMessage<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let erased: ProtocolHandler = Arc::new(
            move |session: Session, raw: WsMessage<Value>| -> HandlerResult<HandlerFuture> {
                let message: T = serde_json::from_value(raw.message).map_err(|source| {
                    HandlerError::InvalidPayload {
                        protocol_id: raw.header.id.clone(),
                        source,
                    }
                })?;
                let future: HandlerFuture =
                    Box::pin(handler(session, WsMessage::new(raw.header, message)));
                Ok(future)
            },
        );

        self.protocols.insert(protocol_id.into(), erased);
        self
    }

    /// Take over every protocol handler of `other`
    pub fn merge_protocols(mut self, other: Dispatcher) -> Self {
        self.protocols.extend(other.protocols);
        self
    }

    pub fn has_protocol(&self, protocol_id: &str) -> bool {
        self.protocols.contains_key(protocol_id)
    }

    /// Run the handler for one inbound envelope to completion
    pub(crate) async fn dispatch(&self, session: &Session, envelope: Envelope) {
        match self.route(session, envelope) {
            Ok(future) => future.await,
            Err(HandlerError::NoHandler(kind)) => {
                tracing::trace!(session_id = %session.id(), kind = %kind, "No handler, frame dropped");
            }
            Err(e) => {
                tracing::warn!(session_id = %session.id(), error = %e, "Dropping inbound message");
            }
        }
    }

    fn route(&self, session: &Session, envelope: Envelope) -> HandlerResult<HandlerFuture> {
        match envelope.kind() {
            FrameKind::Text => {
                let text = String::from_utf8_lossy(envelope.payload()).into_owned();

                if !self.protocols.is_empty() {
                    if let Ok(raw) = serde_json::from_str::<WsMessage<Value>>(&text) {
                        if let Some(handler) = self.protocols.get(&raw.header.id) {
                            return handler(session.clone(), raw);
                        }
                    }
                }

                let handler = self.text.as_ref().ok_or(HandlerError::NoHandler(FrameKind::Text))?;
                Ok(handler(session.clone(), text))
            }
            FrameKind::Binary => {
                let handler = self
                    .binary
                    .as_ref()
                    .ok_or(HandlerError::NoHandler(FrameKind::Binary))?;
                Ok(handler(session.clone(), envelope.into_payload()))
            }
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut protocols: Vec<&String> = self.protocols.keys().collect();
        protocols.sort();
        f.debug_struct("Dispatcher")
            .field("text", &self.text.is_some())
            .field("binary", &self.binary.is_some())
            .field("protocols", &protocols)
            .finish()
    }
}
