//! Lifecycle callbacks

use crate::connection::Session;
use std::fmt;
use std::sync::Arc;

/// Callback invoked with a session on connect or disconnect
pub type SessionCallback = Arc<dyn Fn(&Session) + Send + Sync>;

/// Optional connect and disconnect hooks
///
/// Both run on the coordinator task, so they must not block.
#[derive(Clone, Default)]
pub struct HubCallbacks {
    on_connect: Option<SessionCallback>,
    on_disconnect: Option<SessionCallback>,
}

impl HubCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once after a session joins the live set
    pub fn on_connect<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Session) + Send + Sync + 'static,
    {
        self.on_connect = Some(Arc::new(callback));
        self
    }

    /// Called once when a session leaves the live set, for any reason
    pub fn on_disconnect<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Session) + Send + Sync + 'static,
    {
        self.on_disconnect = Some(Arc::new(callback));
        self
    }

    pub(crate) fn connected(&self, session: &Session) {
        if let Some(callback) = &self.on_connect {
            callback(session);
        }
    }

    pub(crate) fn disconnected(&self, session: &Session) {
        if let Some(callback) = &self.on_disconnect {
            callback(session);
        }
    }
}

impl fmt::Debug for HubCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubCallbacks")
            .field("on_connect", &self.on_connect.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .finish()
    }
}
