//! WebSocket close codes
//!
//! The RFC 6455 status codes this crate sends or reasons about.

/// WebSocket close status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    /// Normal closure
    Normal = 1000,
    /// Endpoint is going away (server shutdown, page navigation)
    GoingAway = 1001,
    /// Protocol error
    ProtocolError = 1002,
    /// Unsupported data type
    Unsupported = 1003,
    /// Close frame carried no status code
    NoStatus = 1005,
    /// Connection dropped without a close frame
    Abnormal = 1006,
    /// Payload did not match the frame type
    InvalidPayload = 1007,
    /// Policy violation
    PolicyViolation = 1008,
    /// Frame exceeded the size limit
    MessageTooBig = 1009,
    /// Peer hit an unexpected condition
    InternalError = 1011,
}

impl CloseCode {
    /// Create a `CloseCode` from a raw u16 value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1000 => Some(Self::Normal),
            1001 => Some(Self::GoingAway),
            1002 => Some(Self::ProtocolError),
            1003 => Some(Self::Unsupported),
            1005 => Some(Self::NoStatus),
            1006 => Some(Self::Abnormal),
            1007 => Some(Self::InvalidPayload),
            1008 => Some(Self::PolicyViolation),
            1009 => Some(Self::MessageTooBig),
            1011 => Some(Self::InternalError),
            _ => None,
        }
    }

    /// Get the raw u16 value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Whether this code ends a connection in an orderly way
    ///
    /// Normal closure, going away, a bare close frame and a dropped
    /// connection are all part of a peer's ordinary lifecycle.
    #[must_use]
    pub const fn is_expected(self) -> bool {
        matches!(
            self,
            Self::Normal | Self::GoingAway | Self::NoStatus | Self::Abnormal
        )
    }

    /// Classify a raw code; unknown codes are unexpected
    #[must_use]
    pub fn is_expected_code(value: u16) -> bool {
        Self::from_u16(value).is_some_and(Self::is_expected)
    }

    /// Get the description for this close code
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Normal => "Normal closure",
            Self::GoingAway => "Going away",
            Self::ProtocolError => "Protocol error",
            Self::Unsupported => "Unsupported data",
            Self::NoStatus => "No status received",
            Self::Abnormal => "Abnormal closure",
            Self::InvalidPayload => "Invalid frame payload",
            Self::PolicyViolation => "Policy violation",
            Self::MessageTooBig => "Message too big",
            Self::InternalError => "Internal error",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_u16())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}
