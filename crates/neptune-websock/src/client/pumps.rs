//! Client read and write pumps.

use super::callbacks::ClientCallbacks;
use crate::connection::{write_frame, OutboundReceiver};
use crate::error::{ClientError, WsError};
use crate::protocol::{CloseCode, Envelope, Frame, FrameKind};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Reads frames until the connection ends.
///
/// Fires `on_disconnect` once, then cancels `done` so the writer and any
/// `closed()` waiters wake up.
pub(crate) async fn read_pump<S>(
    mut stream: S,
    callbacks: Arc<ClientCallbacks>,
    url: String,
    done: CancellationToken,
) where
    S: Stream<Item = Result<Frame, WsError>> + Unpin,
{
    loop {
        match stream.next().await {
            Some(Ok(Frame::Text(payload))) => {
                callbacks.read(&Envelope::new(FrameKind::Text, payload));
            }
            Some(Ok(Frame::Binary(payload))) => {
                callbacks.read(&Envelope::new(FrameKind::Binary, payload));
            }
            Some(Ok(Frame::Ping(_) | Frame::Pong(_))) => {
                tracing::trace!(url = %url, "Control frame received");
            }
            Some(Ok(Frame::Close(reason))) => {
                match &reason {
                    Some(r) if !CloseCode::is_expected_code(r.code) => {
                        tracing::warn!(url = %url, code = r.code, reason = %r.reason, "Server closed connection unexpectedly");
                    }
                    _ => tracing::info!(url = %url, "Server closed connection"),
                }
                break;
            }
            Some(Err(e)) => {
                tracing::warn!(url = %url, error = %e, "Read failed");
                break;
            }
            None => {
                tracing::info!(url = %url, "Connection dropped");
                break;
            }
        }
    }

    callbacks.disconnected(&url);
    done.cancel();
    tracing::debug!(url = %url, "Client reader stopped");
}

/// Writes queued envelopes and control frames until the connection ends.
///
/// A frame on `control` (a close) is written ahead of queued data and ends
/// the pump. Closes the outbound queue on exit so later sends are dropped.
pub(crate) async fn write_pump<S>(
    mut sink: S,
    mut outbound: OutboundReceiver,
    mut control: mpsc::Receiver<Frame>,
    callbacks: Arc<ClientCallbacks>,
    write_wait: Duration,
    done: CancellationToken,
) where
    S: Sink<Frame, Error = WsError> + Unpin,
{
    loop {
        tokio::select! {
            biased;
            () = done.cancelled() => break,
            Some(frame) = control.recv() => {
                outbound.close();
                if let Err(e) = write_frame(&mut sink, frame, write_wait).await {
                    tracing::warn!(error = %e, "Failed to send close frame");
                }
                break;
            }
            envelope = outbound.recv() => {
                let Some(envelope) = envelope else {
                    if let Err(e) = write_frame(&mut sink, Frame::Close(None), write_wait).await {
                        tracing::debug!(error = %e, "Failed to send close frame");
                    }
                    break;
                };

                let frame = match envelope.clone().into_frame() {
                    Ok(frame) => frame,
                    Err(e) => {
                        callbacks.error(&ClientError::from(e));
                        continue;
                    }
                };

                match write_frame(&mut sink, frame, write_wait).await {
                    Ok(()) => callbacks.written(&envelope),
                    Err(e) => {
                        tracing::warn!(error = %e, "Write failed");
                        break;
                    }
                }
            }
        }
    }

    outbound.close();
    if done.is_cancelled() {
        let _ = tokio::time::timeout(write_wait, sink.close()).await;
    }
    tracing::debug!("Client writer stopped");
}
