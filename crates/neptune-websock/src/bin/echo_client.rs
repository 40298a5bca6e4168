//! Echo client entry point
//!
//! Dials the echo server, sends one text and one binary message, waits for
//! the echoes and disconnects cleanly.
//!
//! ```bash
//! cargo run -p neptune-websock --bin neptune-echo-client
//! ```

use neptune_common::{try_init_tracing, AppConfig, AppError, AppResult};
use neptune_websock::{ClientCallbacks, WsClient};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// How long to wait for each echo
const ECHO_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    if let Err(e) = try_init_tracing() {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run().await {
        error!(code = e.error_code(), error = %e, "Echo client failed");
        std::process::exit(1);
    }
}

async fn run() -> AppResult<()> {
    let config = AppConfig::from_env()?;
    let (echo_tx, mut echo_rx) = mpsc::unbounded_channel();

    let callbacks = ClientCallbacks::new()
        .on_connect(|url| info!(url, "Connected"))
        .on_disconnect(|url| info!(url, "Disconnected"))
        .on_write_message(|envelope| info!(kind = %envelope.kind(), len = envelope.len(), "Sent"))
        .on_read_message(move |envelope| {
            info!(kind = %envelope.kind(), len = envelope.len(), "Received");
            let _ = echo_tx.send(envelope.clone());
        })
        .on_error(|e| warn!(error = %e, "Client error"));

    let mut client = WsClient::new(callbacks);
    client
        .connect(&config.client.target, &config.client.ws_path)
        .await
        .map_err(AppError::client)?;

    client.send_text("hello from neptune").await;
    client.send_binary(vec![0x6e, 0x65, 0x70]).await;

    for _ in 0..2 {
        match tokio::time::timeout(ECHO_TIMEOUT, echo_rx.recv()).await {
            Ok(Some(envelope)) => match envelope.as_text() {
                Some(text) => info!(text, "Echo"),
                None => info!(bytes = ?envelope.payload().as_ref(), "Echo"),
            },
            Ok(None) => break,
            Err(_) => {
                warn!("Timed out waiting for echo");
                break;
            }
        }
    }

    client.disconnect().await.map_err(AppError::client)?;
    if tokio::time::timeout(ECHO_TIMEOUT, client.closed()).await.is_err() {
        warn!("Server did not complete the close handshake");
    }

    Ok(())
}
