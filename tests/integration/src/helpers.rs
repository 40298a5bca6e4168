//! Test helpers for integration tests
//!
//! Provides utilities for spawning test servers, dialing raw WebSocket
//! connections and waiting on asynchronous state.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use neptune_common::ServerConfig;
use neptune_websock::{Dispatcher, Hub, WsConfig, WsServer};
use reqwest::{Client, Response};
use tokio::net::TcpStream;
use tokio_rustls::rustls::{self, pki_types::ServerName};
use tokio_rustls::{client::TlsStream, TlsConnector};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Raw client socket used to observe frames directly
pub type RawSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Raw client socket over a TLS stream
pub type TlsSocket = WebSocketStream<TlsStream<TcpStream>>;

/// Default time to wait for asynchronous conditions
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Server-side lifecycle counters
#[derive(Debug, Default)]
pub struct ServerEvents {
    pub connected: AtomicUsize,
    pub disconnected: AtomicUsize,
}

impl ServerEvents {
    pub fn connected(&self) -> usize {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn disconnected(&self) -> usize {
        self.disconnected.load(Ordering::SeqCst)
    }
}

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub events: Arc<ServerEvents>,
    server: WsServer,
}

impl TestServer {
    /// Start a server on an ephemeral loopback port
    pub async fn start(dispatcher: Dispatcher) -> Result<Self> {
        Self::start_with(dispatcher, WsConfig::default(), |server| server).await
    }

    /// Start a server, letting the caller adjust the builder first
    pub async fn start_with<F>(dispatcher: Dispatcher, ws_config: WsConfig, configure: F) -> Result<Self>
    where
        F: FnOnce(WsServer) -> WsServer,
    {
        Self::launch(dispatcher, ws_config, configure, false).await
    }

    /// Start a `wss://` server using the certificates under `certs/`
    pub async fn start_tls(dispatcher: Dispatcher) -> Result<Self> {
        Self::launch(dispatcher, WsConfig::default(), |server| server, true).await
    }

    async fn launch<F>(dispatcher: Dispatcher, ws_config: WsConfig, configure: F, tls: bool) -> Result<Self>
    where
        F: FnOnce(WsServer) -> WsServer,
    {
        let events = Arc::new(ServerEvents::default());
        let (on_connect, on_disconnect) = (events.clone(), events.clone());

        let server = WsServer::new(test_config(), dispatcher)
            .with_ws_config(ws_config)
            .on_connect(move |_session| {
                on_connect.connected.fetch_add(1, Ordering::SeqCst);
            })
            .on_disconnect(move |_session| {
                on_disconnect.disconnected.fetch_add(1, Ordering::SeqCst);
            });
        let mut server = configure(server);

        let addr = if tls {
            let certs = cert_dir();
            server.run_with_tls(certs.join("server.pem"), certs.join("server.key")).await?
        } else {
            server.run().await?
        };

        // Create HTTP client
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            events,
            server,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// WebSocket URL of the default path
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// `host:port` form used by `WsClient::connect`
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    pub fn hub(&self) -> &Hub {
        self.server
            .hub()
            .expect("test server is running")
    }

    pub fn server(&self) -> &WsServer {
        &self.server
    }

    /// Dial the WebSocket endpoint with a bare tungstenite client
    pub async fn connect_raw(&self) -> Result<RawSocket> {
        let (socket, _) = tokio_tungstenite::connect_async(self.ws_url()).await?;
        Ok(socket)
    }

    /// Dial the `wss://` endpoint, trusting only the test CA
    pub async fn connect_tls(&self) -> Result<TlsSocket> {
        let ca = std::fs::read(cert_dir().join("ca.pem"))?;
        let mut reader = ca.as_slice();
        let mut roots = rustls::RootCertStore::empty();
        for cert in rustls_pemfile::certs(&mut reader) {
            roots.add(cert?)?;
        }

        let config = rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();
        let connector = TlsConnector::from(Arc::new(config));

        let tcp = TcpStream::connect(self.addr).await?;
        let stream = connector.connect(ServerName::try_from("localhost")?, tcp).await?;
        let url = format!("wss://localhost:{}/ws", self.addr.port());
        let (socket, _) = tokio_tungstenite::client_async(url, stream).await?;
        Ok(socket)
    }

    /// Wait until the hub reports `count` live sessions
    pub async fn wait_for_sessions(&self, count: usize) -> Result<()> {
        let hub = self.hub().clone();
        wait_until(move || {
            let hub = hub.clone();
            async move { hub.sessions().await.len() == count }
        })
        .await
    }

    /// Drain and stop the server
    pub async fn stop(mut self) -> Result<()> {
        self.server.stop().await?;
        Ok(())
    }
}

/// Create a test configuration bound to an ephemeral loopback port
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..ServerConfig::default()
    }
}

/// Directory holding the test CA and the `localhost` server certificate
pub fn cert_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("certs")
}

/// Poll `condition` until it holds or [`WAIT_TIMEOUT`] elapses
pub async fn wait_until<F, Fut>(mut condition: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    loop {
        if condition().await {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            anyhow::bail!("Condition not met within {WAIT_TIMEOUT:?}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
