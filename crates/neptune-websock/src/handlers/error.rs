//! Handler error types

use crate::protocol::FrameKind;
use thiserror::Error;

/// Reasons an inbound frame reached no handler
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Message body did not match the protocol's type
    #[error("Invalid payload for protocol {protocol_id}: {source}")]
    InvalidPayload {
        protocol_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// No handler registered for this frame kind
    #[error("No {0} handler registered")]
    NoHandler(FrameKind),
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
