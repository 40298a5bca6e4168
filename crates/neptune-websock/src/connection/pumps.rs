//! Server-side read and write pumps
//!
//! Each session runs one reader and one writer. The reader owns the
//! inbound half and the read deadline; the writer owns the outbound half,
//! the ping ticker and the per-write deadline.

use super::queue::OutboundReceiver;
use super::session::Session;
use crate::config::WsConfig;
use crate::error::WsError;
use crate::hub::Hub;
use crate::protocol::{normalize_text, CloseCode, CloseReason, Envelope, Frame, FrameKind};
use bytes::Bytes;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Write one frame under a deadline
pub(crate) async fn write_frame<S>(sink: &mut S, frame: Frame, deadline: Duration) -> Result<(), WsError>
where
    S: Sink<Frame, Error = WsError> + Unpin,
{
    match tokio::time::timeout(deadline, sink.send(frame)).await {
        Ok(result) => result,
        Err(_) => Err(WsError::WriteTimeout(deadline)),
    }
}

/// Why a reader stopped
#[derive(Debug)]
enum ReadEnd {
    PeerClosed(Option<CloseReason>),
    StreamEnded,
    DeadlineExpired,
    LocalClose,
    Error(WsError),
}

impl ReadEnd {
    fn log(&self, session_id: Uuid) {
        match self {
            Self::PeerClosed(Some(reason)) if CloseCode::is_expected_code(reason.code) => {
                tracing::info!(session_id = %session_id, code = reason.code, "Peer closed connection");
            }
            Self::PeerClosed(Some(reason)) => {
                tracing::warn!(
                    session_id = %session_id,
                    code = reason.code,
                    reason = %reason.reason,
                    "Peer closed connection unexpectedly"
                );
            }
            Self::PeerClosed(None) => {
                tracing::info!(session_id = %session_id, "Peer closed connection without status");
            }
            Self::StreamEnded => {
                tracing::info!(session_id = %session_id, "Connection dropped");
            }
            Self::LocalClose => {
                tracing::debug!(session_id = %session_id, "Writer closed connection");
            }
            Self::DeadlineExpired => {
                tracing::warn!(session_id = %session_id, "Read deadline expired");
            }
            Self::Error(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Read failed");
            }
        }
    }
}

/// Read frames until the connection ends, then unregister the session
///
/// Every inbound frame, pongs included, pushes the read deadline out by
/// `pong_wait`.
pub(crate) async fn read_pump<S>(
    mut stream: S,
    session: Session,
    hub: Hub,
    connection_closed: CancellationToken,
) where
    S: Stream<Item = Result<Frame, WsError>> + Unpin,
{
    let pong_wait = hub.config().pong_wait;
    let deadline = tokio::time::sleep(pong_wait);
    tokio::pin!(deadline);

    let end = loop {
        tokio::select! {
            () = connection_closed.cancelled() => break ReadEnd::LocalClose,
            () = &mut deadline => break ReadEnd::DeadlineExpired,
            frame = stream.next() => {
                let frame = match frame {
                    Some(Ok(frame)) => frame,
                    Some(Err(e)) => break ReadEnd::Error(e),
                    None => break ReadEnd::StreamEnded,
                };

                deadline.as_mut().reset(Instant::now() + pong_wait);

                match frame {
                    Frame::Text(payload) => {
                        let envelope = Envelope::new(FrameKind::Text, normalize_text(&payload));
                        hub.dispatcher().dispatch(&session, envelope).await;
                    }
                    Frame::Binary(payload) => {
                        let envelope = Envelope::new(FrameKind::Binary, payload);
                        hub.dispatcher().dispatch(&session, envelope).await;
                    }
                    Frame::Ping(_) => {
                        tracing::trace!(session_id = %session.id(), "Ping received");
                    }
                    Frame::Pong(_) => {
                        tracing::trace!(session_id = %session.id(), "Pong received");
                    }
                    Frame::Close(reason) => break ReadEnd::PeerClosed(reason),
                }
            }
        }
    };

    end.log(session.id());
    hub.unregister(&session).await;
}

/// Drain the outbound queue onto the sink and keep the peer pinged
///
/// Ends when the queue is closed (after writing a close frame) or when a
/// write fails. Always cancels `connection_closed` on the way out.
pub(crate) async fn write_pump<S>(
    mut sink: S,
    mut outbound: OutboundReceiver,
    config: WsConfig,
    session_id: Uuid,
    connection_closed: CancellationToken,
) where
    S: Sink<Frame, Error = WsError> + Unpin,
{
    let ping_period = config.ping_interval();
    let mut ticker = tokio::time::interval_at(Instant::now() + ping_period, ping_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            envelope = outbound.recv() => {
                let Some(envelope) = envelope else {
                    if let Err(e) = write_frame(&mut sink, Frame::Close(None), config.write_wait).await {
                        tracing::debug!(session_id = %session_id, error = %e, "Failed to send close frame");
                    }
                    tracing::debug!(session_id = %session_id, "Outbound queue closed");
                    break;
                };

                let frame = match envelope.into_frame() {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::warn!(session_id = %session_id, error = %e, "Dropping text message with invalid UTF-8");
                        continue;
                    }
                };

                if let Err(e) = write_frame(&mut sink, frame, config.write_wait).await {
                    tracing::warn!(session_id = %session_id, error = %e, "Write failed");
                    break;
                }
            }
            _ = ticker.tick() => {
                if let Err(e) = write_frame(&mut sink, Frame::Ping(Bytes::new()), config.write_wait).await {
                    tracing::warn!(session_id = %session_id, error = %e, "Ping failed");
                    break;
                }
            }
        }
    }

    outbound.close();
    let _ = tokio::time::timeout(config.write_wait, sink.close()).await;
    connection_closed.cancel();
    tracing::debug!(session_id = %session_id, "Writer stopped");
}
