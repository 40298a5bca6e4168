//! WebSocket client actor.
//!
//! Dials a server, then runs a reader and a writer task for the lifetime of
//! the connection. Application code interacts through [`WsClient`] and the
//! hooks in [`ClientCallbacks`].

mod callbacks;
mod pumps;

pub use callbacks::{ClientCallbacks, EnvelopeCallback, ErrorCallback, UrlCallback};

use crate::config::WsConfig;
use crate::connection::{outbound_queue, transport, EnqueueError, OutboundSender};
use crate::error::ClientError;
use crate::protocol::{CloseCode, CloseReason, Envelope, Frame, FrameKind};
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_util::sync::CancellationToken;

/// State of one established connection.
struct ClientConnection {
    url: String,
    outbound: OutboundSender,
    control: mpsc::Sender<Frame>,
    done: CancellationToken,
    read_handle: JoinHandle<()>,
    write_handle: JoinHandle<()>,
}

/// WebSocket client.
///
/// Starts idle; [`WsClient::connect`] dials the server. Sends are queued
/// and written in order by the writer task.
pub struct WsClient {
    callbacks: Arc<ClientCallbacks>,
    config: WsConfig,
    connection: Option<ClientConnection>,
}

impl WsClient {
    pub fn new(callbacks: ClientCallbacks) -> Self {
        Self {
            callbacks: Arc::new(callbacks),
            config: WsConfig::default(),
            connection: None,
        }
    }

    pub fn with_config(mut self, config: WsConfig) -> Self {
        self.config = config;
        self
    }

    /// Dial `ws://{address}{path}` and start the pumps.
    ///
    /// A failed dial is reported to `on_error` and returned; the client
    /// stays idle.
    pub async fn connect(&mut self, address: &str, path: &str) -> Result<(), ClientError> {
        if self.is_connected() {
            return Err(ClientError::AlreadyConnected);
        }

        let url = format!("ws://{address}{path}");

        let mut ws_config = WebSocketConfig::default();
        ws_config.max_message_size = Some(self.config.max_message_size);
        ws_config.max_frame_size = Some(self.config.max_message_size);

        let (socket, _) =
            match tokio_tungstenite::connect_async_with_config(url.as_str(), Some(ws_config), false).await {
                Ok(connected) => connected,
                Err(source) => {
                    let err = ClientError::Connect { url, source };
                    tracing::warn!(error = %err, "Dial failed");
                    self.callbacks.error(&err);
                    return Err(err);
                }
            };

        let (sink, stream) = transport::split_tungstenite(socket);
        let (outbound, outbound_rx) = outbound_queue(self.config.send_buffer);
        let (control, control_rx) = mpsc::channel(1);
        let done = CancellationToken::new();

        let write_handle = tokio::spawn(pumps::write_pump(
            sink,
            outbound_rx,
            control_rx,
            self.callbacks.clone(),
            self.config.write_wait,
            done.clone(),
        ));
        let read_handle = tokio::spawn(pumps::read_pump(
            stream,
            self.callbacks.clone(),
            url.clone(),
            done.clone(),
        ));

        if let Some(previous) = self.connection.replace(ClientConnection {
            url: url.clone(),
            outbound,
            control,
            done,
            read_handle,
            write_handle,
        }) {
            previous.read_handle.abort();
            previous.write_handle.abort();
        }

        tracing::info!(url = %url, "Connected");
        self.callbacks.connected(&url);
        Ok(())
    }

    /// URL of the current or last connection.
    pub fn url(&self) -> Option<&str> {
        self.connection.as_ref().map(|c| c.url.as_str())
    }

    /// Whether the reader is still running.
    pub fn is_connected(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|c| !c.done.is_cancelled())
    }

    /// Queue a frame for the server.
    ///
    /// Waits while the queue is full; dropped with a warning when the client
    /// is not connected or the connection has ended.
    pub async fn send(&self, kind: FrameKind, payload: impl Into<Bytes>) {
        self.send_envelope(Envelope::new(kind, payload)).await;
    }

    pub async fn send_text(&self, text: impl Into<String>) {
        self.send_envelope(Envelope::text(text)).await;
    }

    pub async fn send_binary(&self, data: impl Into<Bytes>) {
        self.send_envelope(Envelope::binary(data)).await;
    }

    /// Serialize a value and queue it as a text frame.
    ///
    /// Encoding failures go to `on_error` and the value is not sent.
    pub async fn send_object<T: Serialize + ?Sized>(&self, value: &T) {
        match Envelope::json(value) {
            Ok(envelope) => self.send_envelope(envelope).await,
            Err(e) => {
                let err = ClientError::from(e);
                tracing::warn!(error = %err, "Dropping outbound object");
                self.callbacks.error(&err);
            }
        }
    }

    pub async fn send_envelope(&self, envelope: Envelope) {
        let Some(connection) = &self.connection else {
            tracing::warn!(kind = %envelope.kind(), "Not connected, dropping outbound message");
            return;
        };

        if let Err(EnqueueError::Closed(envelope) | EnqueueError::Full(envelope)) =
            connection.outbound.send(envelope).await
        {
            tracing::warn!(
                url = %connection.url,
                kind = %envelope.kind(),
                "Connection closed, dropping outbound message"
            );
        }
    }

    /// Start a clean close handshake.
    ///
    /// Writes a normal-closure frame ahead of queued data and stops further
    /// writes. The connection ends once the server answers; wait for that
    /// with [`WsClient::closed`].
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        let connection = self.connection.as_ref().ok_or(ClientError::NotConnected)?;

        let close = Frame::Close(Some(CloseReason::new(CloseCode::Normal, "")));
        if connection.control.send(close).await.is_err() {
            tracing::debug!(url = %connection.url, "Writer already stopped");
        }
        Ok(())
    }

    /// Resolves once the current connection has ended.
    pub async fn closed(&self) {
        if let Some(connection) = &self.connection {
            connection.done.cancelled().await;
        }
    }
}

impl Drop for WsClient {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.read_handle.abort();
            connection.write_handle.abort();
        }
    }
}
