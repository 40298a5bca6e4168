//! WebSocket handler
//!
//! Upgrades HTTP requests on the WebSocket path and hands the socket to the
//! session pumps.

use crate::connection::{run_session, transport};
use crate::server::WsState;
use axum::{
    extract::{connect_info::Connected, ws::WebSocket, ConnectInfo, State, WebSocketUpgrade},
    response::IntoResponse,
    serve::IncomingStream,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use super::TlsListener;

/// Remote address of an accepted connection
///
/// Filled in for any listener that reports a `SocketAddr`, plain TCP and
/// TLS alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerAddr(pub SocketAddr);

impl Connected<IncomingStream<'_, TcpListener>> for PeerAddr {
    fn connect_info(stream: IncomingStream<'_, TcpListener>) -> Self {
        Self(*stream.remote_addr())
    }
}

impl Connected<IncomingStream<'_, TlsListener>> for PeerAddr {
    fn connect_info(stream: IncomingStream<'_, TlsListener>) -> Self {
        Self(*stream.remote_addr())
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    State(state): State<WsState>,
    ConnectInfo(PeerAddr(peer_addr)): ConnectInfo<PeerAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let max_message_size = state.hub().config().max_message_size;

    ws.max_message_size(max_message_size)
        .max_frame_size(max_message_size)
        .on_failed_upgrade(move |e| {
            tracing::warn!(peer_addr = %peer_addr, error = %e, "WebSocket upgrade failed");
        })
        .on_upgrade(move |socket| handle_socket(state, socket, peer_addr))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: WsState, socket: WebSocket, peer_addr: SocketAddr) {
    let (sink, stream) = transport::split_axum(socket);
    run_session(state.hub().clone(), sink, stream, Some(peer_addr)).await;
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}
