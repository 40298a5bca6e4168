//! Application error types
//!
//! Top-level error type for the binaries. Library crates keep their own
//! error enums and convert into this one at the edge.

use crate::config::ConfigError;
use std::fmt;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    // I/O errors (bind, file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Server lifecycle errors
    #[error("Server error: {0}")]
    Server(String),

    // Client connection errors
    #[error("Client error: {0}")]
    Client(String),
}

impl AppError {
    /// Get a stable error code for logs
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Server(_) => "SERVER_ERROR",
            Self::Client(_) => "CLIENT_ERROR",
        }
    }

    /// Create a server error
    #[must_use]
    pub fn server(msg: impl fmt::Display) -> Self {
        Self::Server(msg.to_string())
    }

    /// Create a client error
    #[must_use]
    pub fn client(msg: impl fmt::Display) -> Self {
        Self::Client(msg.to_string())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
