//! Connection management
//!
//! Per-session outbound queues, the session handle, and the pumps that move
//! frames between a socket and the hub.

mod pumps;
mod queue;
mod session;
pub(crate) mod transport;

pub use queue::{outbound_queue, EnqueueError, OutboundReceiver, OutboundSender};
pub use session::Session;

pub(crate) use pumps::write_frame;

use crate::error::WsError;
use crate::hub::Hub;
use crate::protocol::Frame;
use futures_util::{Sink, Stream};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;

/// Serve one accepted connection until it ends
///
/// Registers a new session, spawns its writer, and runs its reader on the
/// current task.
pub(crate) async fn run_session<Si, St>(hub: Hub, sink: Si, stream: St, peer_addr: Option<SocketAddr>)
where
    Si: Sink<Frame, Error = WsError> + Send + Unpin + 'static,
    St: Stream<Item = Result<Frame, WsError>> + Unpin,
{
    let (session, outbound) = hub.new_session(peer_addr);
    let session_id = session.id();

    if !hub.register(session.clone()).await {
        tracing::warn!(session_id = %session_id, "Hub stopped, rejecting connection");
        return;
    }

    tracing::info!(
        session_id = %session_id,
        peer_addr = ?peer_addr,
        "WebSocket connection established"
    );

    let connection_closed = CancellationToken::new();
    hub.spawn_writer(pumps::write_pump(
        sink,
        outbound,
        hub.config().clone(),
        session_id,
        connection_closed.clone(),
    ));

    pumps::read_pump(stream, session, hub, connection_closed).await;
}
