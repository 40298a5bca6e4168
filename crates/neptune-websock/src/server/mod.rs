//! WebSocket server
//!
//! Wires the hub into an axum router and owns the listener lifecycle.

mod handler;
mod state;
mod tls;

pub use handler::{health_check, ws_handler, PeerAddr};
pub use state::WsState;
pub use tls::{load_acceptor, TlsListener};

use crate::config::WsConfig;
use crate::connection::Session;
use crate::error::ServerError;
use crate::handlers::Dispatcher;
use crate::hub::{Hub, HubCallbacks};
use crate::protocol::{Envelope, FrameKind};
use axum::serve::Listener;
use axum::{routing::get, Router};
use bytes::Bytes;
use neptune_common::ServerConfig;
use std::net::SocketAddr;
use std::path::Path;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Create the WebSocket router
pub fn create_router(ws_path: &str) -> Router<WsState> {
    Router::new()
        .route(ws_path, get(ws_handler))
        .route("/health", get(health_check))
}

/// A listener that is currently serving
struct Running {
    hub: Hub,
    local_addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    serve_task: JoinHandle<std::io::Result<()>>,
}

/// WebSocket server with a session hub
pub struct WsServer {
    config: ServerConfig,
    ws_config: WsConfig,
    dispatcher: Dispatcher,
    callbacks: HubCallbacks,
    routes: Option<Router>,
    running: Option<Running>,
}

impl WsServer {
    pub fn new(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            ws_config: WsConfig::default(),
            dispatcher,
            callbacks: HubCallbacks::new(),
            routes: None,
            running: None,
        }
    }

    pub fn with_ws_config(mut self, ws_config: WsConfig) -> Self {
        self.ws_config = ws_config;
        self
    }

    /// Called once for every session that joins the hub
    pub fn on_connect<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Session) + Send + Sync + 'static,
    {
        self.callbacks = self.callbacks.on_connect(callback);
        self
    }

    /// Called once for every session that leaves the hub
    pub fn on_disconnect<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Session) + Send + Sync + 'static,
    {
        self.callbacks = self.callbacks.on_disconnect(callback);
        self
    }

    /// Serve additional HTTP routes next to the WebSocket endpoint
    pub fn with_routes(mut self, routes: Router) -> Self {
        self.routes = Some(match self.routes.take() {
            Some(existing) => existing.merge(routes),
            None => routes,
        });
        self
    }

    /// Serve a directory of static files under `prefix`
    pub fn with_static_files(mut self, prefix: impl Into<String>, dir: impl AsRef<Path>) -> Self {
        self.config.static_files = Some(neptune_common::StaticFilesConfig {
            prefix: prefix.into(),
            dir: dir.as_ref().to_path_buf(),
        });
        self
    }

    /// Bind a plain TCP listener and start serving `ws://`
    ///
    /// Returns the bound address, which differs from the configured one
    /// when port 0 was requested.
    pub async fn run(&mut self) -> Result<SocketAddr, ServerError> {
        if self.running.is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        let listener = TcpListener::bind(self.config.address()).await?;
        let local_addr = listener.local_addr()?;
        self.start(listener, local_addr);

        tracing::info!("WebSocket server listening on ws://{}{}", local_addr, self.config.ws_path);
        Ok(local_addr)
    }

    /// Bind a TLS listener and start serving `wss://`
    pub async fn run_with_tls(
        &mut self,
        cert_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
    ) -> Result<SocketAddr, ServerError> {
        if self.running.is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        let acceptor = load_acceptor(cert_path.as_ref(), key_path.as_ref())?;
        let listener = TcpListener::bind(self.config.address()).await?;
        let local_addr = listener.local_addr()?;
        self.start(TlsListener::new(listener, acceptor), local_addr);

        tracing::info!("WebSocket server listening on wss://{}{}", local_addr, self.config.ws_path);
        Ok(local_addr)
    }

    fn start<L>(&mut self, listener: L, local_addr: SocketAddr)
    where
        L: Listener<Addr = SocketAddr>,
        for<'a> PeerAddr: axum::extract::connect_info::Connected<axum::serve::IncomingStream<'a, L>>,
    {
        let hub = Hub::spawn(
            self.ws_config.clone(),
            self.dispatcher.clone(),
            self.callbacks.clone(),
        );
        let app = self.build_app(hub.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let serve_task = tokio::spawn(async move {
            let result = axum::serve(listener, app.into_make_service_with_connect_info::<PeerAddr>())
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;

            if let Err(e) = &result {
                tracing::error!(error = %e, "WebSocket server stopped with error");
            }
            result
        });

        self.running = Some(Running {
            hub,
            local_addr,
            shutdown_tx,
            serve_task,
        });
    }

    /// Build the complete application
    fn build_app(&self, hub: Hub) -> Router {
        let mut app = create_router(&self.config.ws_path).with_state(WsState::new(hub));

        if let Some(routes) = &self.routes {
            app = app.merge(routes.clone());
        }

        if let Some(static_files) = &self.config.static_files {
            let serve_dir = ServeDir::new(&static_files.dir);
            let prefix = static_files.prefix.trim_end_matches('/');
            app = if prefix.is_empty() {
                app.fallback_service(serve_dir)
            } else {
                app.nest_service(prefix, serve_dir)
            };
            tracing::debug!(prefix = %static_files.prefix, dir = %static_files.dir.display(), "Serving static files");
        }

        app.layer(TraceLayer::new_for_http())
    }

    /// The running hub, if the server has been started
    pub fn hub(&self) -> Option<&Hub> {
        self.running.as_ref().map(|running| &running.hub)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr)
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Send an envelope to every connected session
    pub async fn broadcast(&self, envelope: Envelope) -> Result<(), ServerError> {
        let hub = self.hub().ok_or(ServerError::NotRunning)?;
        hub.broadcast(envelope).await;
        Ok(())
    }

    pub async fn broadcast_message(&self, kind: FrameKind, payload: impl Into<Bytes>) -> Result<(), ServerError> {
        self.broadcast(Envelope::new(kind, payload)).await
    }

    /// Drain every session, then shut the listener down
    ///
    /// Connected peers receive a close frame before the listener stops
    /// accepting.
    pub async fn stop(&mut self) -> Result<(), ServerError> {
        let running = self.running.take().ok_or(ServerError::NotRunning)?;

        tracing::info!(sessions = running.hub.session_count(), "Stopping WebSocket server");
        running.hub.stop().await;

        let _ = running.shutdown_tx.send(());
        match running.serve_task.await {
            Ok(Ok(())) => {
                tracing::info!("WebSocket server shut down gracefully");
                Ok(())
            }
            Ok(Err(e)) => Err(ServerError::Io(e)),
            Err(e) => Err(ServerError::Serve(e.to_string())),
        }
    }
}
