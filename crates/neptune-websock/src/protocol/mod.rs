//! Wire-level types
//!
//! Frames as they travel over a connection, the envelopes handed to
//! application code, the structured message format and close codes.

mod close_codes;
mod frame;
mod messages;

pub use close_codes::CloseCode;
pub use frame::{normalize_text, CloseReason, Envelope, Frame, FrameKind};
pub use messages::{WsHeader, WsMessage};
