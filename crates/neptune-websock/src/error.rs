//! Error types
//!
//! One enum per surface: the connection pumps, the server lifecycle and the
//! client actor.

use std::time::Duration;
use tokio_tungstenite::tungstenite;

/// Errors raised while moving frames over a connection
#[derive(Debug, thiserror::Error)]
pub enum WsError {
    #[error("transport error: {0}")]
    Transport(#[from] axum::Error),

    #[error("websocket protocol error: {0}")]
    Protocol(#[from] tungstenite::Error),

    #[error("write did not complete within {0:?}")]
    WriteTimeout(Duration),

    #[error("connection closed")]
    Closed,
}

/// Errors raised by the server lifecycle
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("server is already running")]
    AlreadyRunning,

    #[error("server is not running")]
    NotRunning,

    #[error("server task failed: {0}")]
    Serve(String),
}

/// Errors surfaced by the client actor
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tungstenite::Error,
    },

    #[error("client is already connected")]
    AlreadyConnected,

    #[error("client is not connected")]
    NotConnected,

    #[error("failed to encode message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("text message is not valid UTF-8: {0}")]
    InvalidText(#[from] std::str::Utf8Error),
}
