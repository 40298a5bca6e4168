//! Echo server entry point
//!
//! Run with:
//! ```bash
//! cargo run -p neptune-websock --bin neptune-echo-server
//! ```
//!
//! Configuration is loaded from environment variables.

use neptune_common::{shutdown_signal, try_init_tracing_with_config, AppConfig, AppError, AppResult, TracingConfig};
use neptune_websock::{Dispatcher, WsServer};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing
    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    // Run the server
    if let Err(e) = run(config).await {
        error!(code = e.error_code(), error = %e, "Echo server failed");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> AppResult<()> {
    info!(
        app = %config.app.name,
        env = ?config.app.env,
        address = %config.server.address(),
        "Starting echo server..."
    );

    let dispatcher = Dispatcher::new()
        .on_text(|session, text| async move {
            info!(session_id = %session.id(), text = %text, "Text received");
            session.send_text(text).await;
        })
        .on_binary(|session, data| async move {
            info!(session_id = %session.id(), len = data.len(), "Binary received");
            session.send_binary(data).await;
        });

    let mut server = WsServer::new(config.server.clone(), dispatcher)
        .on_connect(|session| {
            info!(session_id = %session.id(), peer_addr = ?session.peer_addr(), "Client connected");
        })
        .on_disconnect(|session| {
            info!(session_id = %session.id(), "Client disconnected");
        });

    let addr = match &config.server.tls {
        Some(tls) => server.run_with_tls(&tls.cert_path, &tls.key_path).await,
        None => server.run().await,
    }
    .map_err(AppError::server)?;

    info!(%addr, "Echo server ready");

    shutdown_signal().await;

    server.stop().await.map_err(AppError::server)?;
    info!("Echo server stopped");

    Ok(())
}
