//! TLS listener
//!
//! Loads a PEM certificate chain and private key and wraps a TCP listener
//! so axum serves `wss://` connections.

use crate::error::ServerError;
use axum::serve::Listener;
use std::fs::File;
use std::io::{self, BufReader};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::server::TlsStream;
use tokio_rustls::{rustls, TlsAcceptor};

/// Upper bound on a single TLS handshake
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Build an acceptor from PEM files
pub fn load_acceptor(cert_path: &Path, key_path: &Path) -> Result<TlsAcceptor, ServerError> {
    let certs = load_certs(cert_path)?;
    let key = load_key(key_path)?;
    let server_config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| ServerError::Tls(e.to_string()))?;

    Ok(TlsAcceptor::from(Arc::new(server_config)))
}

/// Loads TLS certificates from a PEM file.
fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, ServerError> {
    let cert_file = File::open(path).map_err(|e| {
        ServerError::Tls(format!("Failed to open certificate file '{}': {e}", path.display()))
    })?;
    let mut cert_reader = BufReader::new(cert_file);
    let certs = rustls_pemfile::certs(&mut cert_reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ServerError::Tls(format!("Invalid certificate file '{}': {e}", path.display())))?;
    if certs.is_empty() {
        return Err(ServerError::Tls(format!(
            "No certificates found in '{}'",
            path.display()
        )));
    }
    Ok(certs)
}

/// Loads a private key from a PEM file.
fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, ServerError> {
    let key_file = File::open(path).map_err(|e| {
        ServerError::Tls(format!("Failed to open private key file '{}': {e}", path.display()))
    })?;
    let mut key_reader = BufReader::new(key_file);
    rustls_pemfile::private_key(&mut key_reader)
        .map_err(|e| ServerError::Tls(format!("Invalid private key file '{}': {e}", path.display())))?
        .ok_or_else(|| ServerError::Tls(format!("No private key found in '{}'", path.display())))
}

/// TCP listener that completes a TLS handshake before handing out streams
pub struct TlsListener {
    inner: TcpListener,
    acceptor: TlsAcceptor,
}

impl TlsListener {
    pub fn new(inner: TcpListener, acceptor: TlsAcceptor) -> Self {
        Self { inner, acceptor }
    }
}

impl Listener for TlsListener {
    type Io = TlsStream<TcpStream>;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        loop {
            let (stream, addr) = Listener::accept(&mut self.inner).await;
            match tokio::time::timeout(HANDSHAKE_TIMEOUT, self.acceptor.accept(stream)).await {
                Ok(Ok(tls_stream)) => return (tls_stream, addr),
                Ok(Err(e)) => {
                    tracing::warn!(peer_addr = %addr, error = %e, "TLS handshake failed");
                }
                Err(_) => {
                    tracing::warn!(peer_addr = %addr, "TLS handshake timed out");
                }
            }
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        self.inner.local_addr()
    }
}
