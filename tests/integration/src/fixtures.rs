//! Test fixtures
//!
//! Reusable dispatchers, message types and an instrumented client.

use neptune_websock::{ClientCallbacks, Dispatcher, Envelope, WsClient, WsMessage};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Structured chat payload used by protocol tests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
}

/// Dispatcher that echoes text and binary frames back to the sender
pub fn echo_dispatcher() -> Dispatcher {
    Dispatcher::new()
        .on_text(|session, text| async move { session.send_text(text).await })
        .on_binary(|session, data| async move { session.send_binary(data).await })
}

/// Echo dispatcher that also answers the `chat` protocol with upper-cased text
pub fn chat_dispatcher() -> Dispatcher {
    echo_dispatcher().on_protocol("chat", |session, message: WsMessage<ChatMessage>| async move {
        let reply = format!("{}: {}", message.header.user_id, message.message.text.to_uppercase());
        session.send_text(reply).await;
    })
}

/// Everything a recording client observed
pub struct ClientRecorder {
    pub reads: mpsc::UnboundedReceiver<Envelope>,
    pub connects: Arc<AtomicUsize>,
    pub writes: Arc<AtomicUsize>,
    pub disconnects: Arc<AtomicUsize>,
    pub errors: Arc<Mutex<Vec<String>>>,
}

impl ClientRecorder {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

/// Build a client whose callbacks feed a [`ClientRecorder`]
pub fn recording_client() -> (WsClient, ClientRecorder) {
    let (read_tx, reads) = mpsc::unbounded_channel();
    let connects = Arc::new(AtomicUsize::new(0));
    let writes = Arc::new(AtomicUsize::new(0));
    let disconnects = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(Mutex::new(Vec::new()));

    let callbacks = {
        let connects = connects.clone();
        let writes = writes.clone();
        let disconnects = disconnects.clone();
        let errors = errors.clone();
        ClientCallbacks::new()
            .on_connect(move |_url| {
                connects.fetch_add(1, Ordering::SeqCst);
            })
            .on_read_message(move |envelope| {
                let _ = read_tx.send(envelope.clone());
            })
            .on_write_message(move |_envelope| {
                writes.fetch_add(1, Ordering::SeqCst);
            })
            .on_disconnect(move |_url| {
                disconnects.fetch_add(1, Ordering::SeqCst);
            })
            .on_error(move |e| {
                errors.lock().unwrap().push(e.to_string());
            })
    };

    (
        WsClient::new(callbacks),
        ClientRecorder {
            reads,
            connects,
            writes,
            disconnects,
            errors,
        },
    )
}
