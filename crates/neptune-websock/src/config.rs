//! Connection tuning
//!
//! Timing and sizing knobs shared by every session of a hub, plus the
//! defaults the server ships with.

use std::time::Duration;

/// Maximum time a single frame write may take
pub const WRITE_WAIT: Duration = Duration::from_secs(10);

/// Maximum time between inbound frames before the peer is considered dead
pub const PONG_WAIT: Duration = Duration::from_secs(60);

/// Interval between server pings; must stay below [`PONG_WAIT`]
pub const PING_PERIOD: Duration = Duration::from_secs(54);

/// Shortest ping interval the writer will schedule
pub const MIN_PING_PERIOD: Duration = Duration::from_millis(1);

/// Outbound queue capacity per session
pub const SEND_BUFFER_SIZE: usize = 256;

/// Largest inbound frame accepted, in bytes
pub const MAX_MESSAGE_SIZE: usize = 10 * 1024;

/// How often `stop` re-checks the session count while draining
pub const DRAIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Per-hub connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsConfig {
    pub write_wait: Duration,
    pub pong_wait: Duration,
    pub ping_period: Duration,
    pub send_buffer: usize,
    pub max_message_size: usize,
    pub drain_poll_interval: Duration,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            write_wait: WRITE_WAIT,
            pong_wait: PONG_WAIT,
            ping_period: PING_PERIOD,
            send_buffer: SEND_BUFFER_SIZE,
            max_message_size: MAX_MESSAGE_SIZE,
            drain_poll_interval: DRAIN_POLL_INTERVAL,
        }
    }
}

impl WsConfig {
    /// Set the read deadline; the ping period follows at 9/10 of it
    pub fn with_pong_wait(mut self, pong_wait: Duration) -> Self {
        self.pong_wait = pong_wait;
        self.ping_period = (pong_wait * 9 / 10).max(MIN_PING_PERIOD);
        self
    }

    pub fn with_write_wait(mut self, write_wait: Duration) -> Self {
        self.write_wait = write_wait;
        self
    }

    pub fn with_send_buffer(mut self, capacity: usize) -> Self {
        self.send_buffer = capacity.max(1);
        self
    }

    pub fn with_max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = bytes;
        self
    }

    pub fn with_drain_poll_interval(mut self, interval: Duration) -> Self {
        self.drain_poll_interval = interval;
        self
    }

    /// Ping period as scheduled by the writer, never zero
    pub(crate) fn ping_interval(&self) -> Duration {
        self.ping_period.max(MIN_PING_PERIOD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WsConfig::default();
        assert_eq!(config.write_wait, Duration::from_secs(10));
        assert_eq!(config.pong_wait, Duration::from_secs(60));
        assert_eq!(config.ping_period, Duration::from_secs(54));
        assert_eq!(config.send_buffer, 256);
        assert_eq!(config.max_message_size, 10_240);
        assert!(config.ping_period < config.pong_wait);
    }

    #[test]
    fn test_ping_period_tracks_pong_wait() {
        let config = WsConfig::default().with_pong_wait(Duration::from_secs(10));
        assert_eq!(config.ping_period, Duration::from_secs(9));
    }

    #[test]
    fn test_tiny_pong_wait_keeps_ping_period_positive() {
        let config = WsConfig::default().with_pong_wait(Duration::from_nanos(1));
        assert_eq!(config.ping_period, MIN_PING_PERIOD);

        let config = WsConfig {
            ping_period: Duration::ZERO,
            ..WsConfig::default()
        };
        assert_eq!(config.ping_interval(), MIN_PING_PERIOD);
    }

    #[test]
    fn test_send_buffer_never_zero() {
        let config = WsConfig::default().with_send_buffer(0);
        assert_eq!(config.send_buffer, 1);
    }
}
