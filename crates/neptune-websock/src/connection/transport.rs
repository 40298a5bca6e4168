//! Transport adapters
//!
//! Map the axum and tungstenite socket types onto `Frame` streams and
//! sinks so the pumps stay transport-agnostic.

use crate::error::WsError;
use crate::protocol::{CloseReason, Frame};
use axum::extract::ws::{self, WebSocket};
use bytes::Bytes;
use futures_util::{future, Sink, SinkExt, Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::WebSocketStream;

fn text_bytes(text: &str) -> Bytes {
    Bytes::copy_from_slice(text.as_bytes())
}

/// Text payload for the wire; invalid UTF-8 is replaced and logged
fn utf8_payload<T>(payload: Bytes) -> T
where
    T: TryFrom<Bytes> + From<String>,
{
    T::try_from(payload.clone()).unwrap_or_else(|_| {
        tracing::warn!(len = payload.len(), "Text frame is not valid UTF-8, replacing invalid bytes");
        T::from(String::from_utf8_lossy(&payload).into_owned())
    })
}

impl From<Frame> for ws::Message {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(payload) => Self::Text(utf8_payload(payload)),
            Frame::Binary(payload) => Self::Binary(payload),
            Frame::Ping(payload) => Self::Ping(payload),
            Frame::Pong(payload) => Self::Pong(payload),
            Frame::Close(reason) => Self::Close(reason.map(|r| ws::CloseFrame {
                code: r.code,
                reason: r.reason.into(),
            })),
        }
    }
}

impl From<ws::Message> for Frame {
    fn from(message: ws::Message) -> Self {
        match message {
            ws::Message::Text(text) => Self::Text(text_bytes(text.as_str())),
            ws::Message::Binary(payload) => Self::Binary(payload),
            ws::Message::Ping(payload) => Self::Ping(payload),
            ws::Message::Pong(payload) => Self::Pong(payload),
            ws::Message::Close(frame) => Self::Close(frame.map(|f| CloseReason {
                code: f.code,
                reason: f.reason.as_str().to_string(),
            })),
        }
    }
}

impl From<Frame> for tungstenite::Message {
    fn from(frame: Frame) -> Self {
        use tungstenite::protocol::frame::coding::CloseCode as TungsteniteCloseCode;
        use tungstenite::protocol::CloseFrame;

        match frame {
            Frame::Text(payload) => Self::Text(utf8_payload(payload)),
            Frame::Binary(payload) => Self::Binary(payload),
            Frame::Ping(payload) => Self::Ping(payload),
            Frame::Pong(payload) => Self::Pong(payload),
            Frame::Close(reason) => Self::Close(reason.map(|r| CloseFrame {
                code: TungsteniteCloseCode::from(r.code),
                reason: r.reason.into(),
            })),
        }
    }
}

/// Convert a tungstenite message; raw frames have no counterpart
fn from_tungstenite(message: tungstenite::Message) -> Option<Frame> {
    match message {
        tungstenite::Message::Text(text) => Some(Frame::Text(text_bytes(text.as_str()))),
        tungstenite::Message::Binary(payload) => Some(Frame::Binary(payload)),
        tungstenite::Message::Ping(payload) => Some(Frame::Ping(payload)),
        tungstenite::Message::Pong(payload) => Some(Frame::Pong(payload)),
        tungstenite::Message::Close(frame) => Some(Frame::Close(frame.map(|f| CloseReason {
            code: u16::from(f.code),
            reason: f.reason.as_str().to_string(),
        }))),
        tungstenite::Message::Frame(_) => None,
    }
}

/// Split an upgraded axum socket into a frame sink and stream
pub(crate) fn split_axum(
    socket: WebSocket,
) -> (
    impl Sink<Frame, Error = WsError> + Send + Unpin,
    impl Stream<Item = Result<Frame, WsError>> + Send + Unpin,
) {
    let (sink, stream) = socket.split();

    let sink = sink.with(|frame: Frame| future::ready(Ok::<_, WsError>(ws::Message::from(frame))));
    let stream = stream.map(|message| message.map(Frame::from).map_err(WsError::from));

    (sink, stream)
}

/// Split a client-side tungstenite socket into a frame sink and stream
pub(crate) fn split_tungstenite<S>(
    socket: WebSocketStream<S>,
) -> (
    impl Sink<Frame, Error = WsError> + Send + Unpin,
    impl Stream<Item = Result<Frame, WsError>> + Send + Unpin,
)
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    let (sink, stream) = socket.split();

    let sink = sink.with(|frame: Frame| {
        future::ready(Ok::<_, WsError>(tungstenite::Message::from(frame)))
    });
    let stream = stream.filter_map(|message| {
        future::ready(match message {
            Ok(message) => from_tungstenite(message).map(Ok),
            Err(e) => Some(Err(WsError::from(e))),
        })
    });

    (sink, stream)
}
