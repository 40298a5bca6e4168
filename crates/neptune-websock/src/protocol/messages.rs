//! Structured message format
//!
//! Application payloads that travel as JSON text frames wrapped in a
//! header. The header `id` names the protocol a message belongs to and
//! selects the handler on the receiving side.

use crate::protocol::Envelope;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Message header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsHeader {
    /// Protocol identifier
    pub id: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub user_id: String,

    /// Unix time in milliseconds
    #[serde(default)]
    pub timestamp: i64,
}

impl WsHeader {
    /// Create a header stamped with the current time
    #[must_use]
    pub fn new(id: impl Into<String>, version: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            user_id: user_id.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// A header plus a typed body
///
/// ```json
/// {"header":{"id":"chat","version":"1","user_id":"u1","timestamp":1700000000000},"message":{...}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsMessage<T> {
    pub header: WsHeader,
    pub message: T,
}

impl<T> WsMessage<T> {
    pub fn new(header: WsHeader, message: T) -> Self {
        Self { header, message }
    }

    /// Protocol identifier from the header
    pub fn protocol_id(&self) -> &str {
        &self.header.id
    }
}

impl<T: Serialize> WsMessage<T> {
    /// Serialize to a JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize into a text envelope
    pub fn to_envelope(&self) -> Result<Envelope, serde_json::Error> {
        Envelope::json(self)
    }
}

impl<T: DeserializeOwned> WsMessage<T> {
    /// Parse from a JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
