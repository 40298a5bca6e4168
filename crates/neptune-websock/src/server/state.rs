//! Server state
//!
//! Application state handed to the axum handlers.

use crate::hub::Hub;

/// Server application state
#[derive(Clone)]
pub struct WsState {
    hub: Hub,
}

impl WsState {
    /// Create a new server state
    pub fn new(hub: Hub) -> Self {
        Self { hub }
    }

    /// Get the session hub
    pub fn hub(&self) -> &Hub {
        &self.hub
    }
}
