//! Client callbacks

use crate::error::ClientError;
use crate::protocol::Envelope;
use std::fmt;
use std::sync::Arc;

/// Callback receiving the URL of the connection.
pub type UrlCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Callback receiving an envelope that was read or written.
pub type EnvelopeCallback = Arc<dyn Fn(&Envelope) + Send + Sync>;

/// Callback receiving a client error.
pub type ErrorCallback = Arc<dyn Fn(&ClientError) + Send + Sync>;

/// Optional hooks invoked by the client actor.
///
/// Read and disconnect hooks run on the reader task, the write hook on the
/// writer task. None of them should block.
#[derive(Clone, Default)]
pub struct ClientCallbacks {
    on_connect: Option<UrlCallback>,
    on_disconnect: Option<UrlCallback>,
    on_read_message: Option<EnvelopeCallback>,
    on_write_message: Option<EnvelopeCallback>,
    on_error: Option<ErrorCallback>,
}

impl ClientCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connect<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_connect = Some(Arc::new(callback));
        self
    }

    /// Fires exactly once per connection, when the reader stops
    pub fn on_disconnect<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_disconnect = Some(Arc::new(callback));
        self
    }

    pub fn on_read_message<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        self.on_read_message = Some(Arc::new(callback));
        self
    }

    /// Fires after each data frame has been written to the socket
    pub fn on_write_message<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        self.on_write_message = Some(Arc::new(callback));
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ClientError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }

    pub(crate) fn connected(&self, url: &str) {
        if let Some(callback) = &self.on_connect {
            callback(url);
        }
    }

    pub(crate) fn disconnected(&self, url: &str) {
        if let Some(callback) = &self.on_disconnect {
            callback(url);
        }
    }

    pub(crate) fn read(&self, envelope: &Envelope) {
        if let Some(callback) = &self.on_read_message {
            callback(envelope);
        }
    }

    pub(crate) fn written(&self, envelope: &Envelope) {
        if let Some(callback) = &self.on_write_message {
            callback(envelope);
        }
    }

    pub(crate) fn error(&self, error: &ClientError) {
        if let Some(callback) = &self.on_error {
            callback(error);
        }
    }
}

impl fmt::Debug for ClientCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCallbacks")
            .field("on_connect", &self.on_connect.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field("on_read_message", &self.on_read_message.is_some())
            .field("on_write_message", &self.on_write_message.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
