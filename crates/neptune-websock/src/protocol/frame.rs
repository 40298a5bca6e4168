//! Frames and envelopes

use bytes::Bytes;
use serde::Serialize;
use std::fmt;

/// Kind of a data frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Text,
    Binary,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Binary => f.write_str("binary"),
        }
    }
}

/// An application payload tagged with its frame kind
///
/// Envelopes are immutable once built and cheap to clone, so a broadcast
/// shares one payload across every session queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    kind: FrameKind,
    payload: Bytes,
}

impl Envelope {
    pub fn new(kind: FrameKind, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(FrameKind::Text, Bytes::from(text.into()))
    }

    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self::new(FrameKind::Binary, data)
    }

    /// Serialize a value as a JSON text envelope
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_vec(value).map(|bytes| Self::new(FrameKind::Text, bytes))
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Payload as UTF-8, for text envelopes only
    pub fn as_text(&self) -> Option<&str> {
        match self.kind {
            FrameKind::Text => std::str::from_utf8(&self.payload).ok(),
            FrameKind::Binary => None,
        }
    }

    /// Frame for the wire; a text payload must be valid UTF-8
    pub fn into_frame(self) -> Result<Frame, std::str::Utf8Error> {
        if self.kind == FrameKind::Text {
            std::str::from_utf8(&self.payload)?;
        }
        Ok(Frame::from(self))
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Status code and reason carried by a close frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    pub code: u16,
    pub reason: String,
}

impl CloseReason {
    pub fn new(code: impl Into<u16>, reason: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            reason: reason.into(),
        }
    }
}

/// A single WebSocket frame, independent of the transport library
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(Bytes),
    Binary(Bytes),
    Ping(Bytes),
    Pong(Bytes),
    Close(Option<CloseReason>),
}

impl Frame {
    /// Data frames become envelopes; control frames do not
    pub fn into_envelope(self) -> Option<Envelope> {
        match self {
            Self::Text(payload) => Some(Envelope::new(FrameKind::Text, payload)),
            Self::Binary(payload) => Some(Envelope::new(FrameKind::Binary, payload)),
            Self::Ping(_) | Self::Pong(_) | Self::Close(_) => None,
        }
    }
}

impl From<Envelope> for Frame {
    fn from(envelope: Envelope) -> Self {
        match envelope.kind {
            FrameKind::Text => Self::Text(envelope.payload),
            FrameKind::Binary => Self::Binary(envelope.payload),
        }
    }
}

/// Flatten an inbound text payload onto one line
///
/// Newlines become spaces and surrounding whitespace is trimmed.
pub fn normalize_text(payload: &Bytes) -> Bytes {
    if payload.contains(&b'\n') {
        let flattened: Vec<u8> = payload
            .iter()
            .map(|&b| if b == b'\n' { b' ' } else { b })
            .collect();
        Bytes::copy_from_slice(flattened.trim_ascii())
    } else {
        payload.slice_ref(payload.trim_ascii())
    }
}
