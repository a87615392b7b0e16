//! Heartbeat
//!
//! Detects silently dead feed connections. The client pings on every tick;
//! any inbound frame (data, pong or ping) counts as proof of life. If a ping
//! stays unanswered for longer than `pong_timeout`, the connection is dropped
//! and handed to the reconnection policy.

use std::time::{Duration, Instant};

/// Configuration for heartbeat behavior.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between ping messages.
    pub ping_interval: Duration,
    /// How long a ping may go unanswered before the connection is dead.
    pub pong_timeout: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(20),
            pong_timeout: Duration::from_secs(20),
        }
    }
}

impl HeartbeatConfig {
    /// Create configuration from `FeedSettings`.
    #[must_use]
    pub const fn from_feed_settings(settings: &crate::FeedSettings) -> Self {
        Self {
            ping_interval: settings.heartbeat_interval,
            pong_timeout: settings.heartbeat_timeout,
        }
    }
}

/// What the client should do on a heartbeat tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    /// Send a ping frame.
    SendPing,
    /// A ping is outstanding but has not timed out yet.
    Wait,
    /// The outstanding ping timed out; drop the connection.
    Expired {
        /// Time since the unanswered ping was sent.
        elapsed: Duration,
    },
}

/// Per-connection heartbeat tracker. Created fresh for every connection.
#[derive(Debug)]
pub struct Heartbeat {
    config: HeartbeatConfig,
    last_activity: Instant,
    ping_sent_at: Option<Instant>,
}

impl Heartbeat {
    /// Start tracking a connection that opened at `now`.
    #[must_use]
    pub const fn new(config: HeartbeatConfig, now: Instant) -> Self {
        Self {
            config,
            last_activity: now,
            ping_sent_at: None,
        }
    }

    /// Record inbound traffic of any kind.
    pub const fn on_activity(&mut self, now: Instant) {
        self.last_activity = now;
        self.ping_sent_at = None;
    }

    /// Decide what to do on a tick at `now`.
    pub fn on_tick(&mut self, now: Instant) -> HeartbeatAction {
        match self.ping_sent_at {
            Some(sent) => {
                let elapsed = now.saturating_duration_since(sent);
                if elapsed > self.config.pong_timeout {
                    HeartbeatAction::Expired { elapsed }
                } else {
                    HeartbeatAction::Wait
                }
            }
            None => {
                self.ping_sent_at = Some(now);
                HeartbeatAction::SendPing
            }
        }
    }

    /// Time since the last inbound frame.
    #[must_use]
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    /// The ping interval to schedule ticks with. Never zero.
    #[must_use]
    pub fn ping_interval(&self) -> Duration {
        self.config.ping_interval.max(Duration::from_millis(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heartbeat(timeout_ms: u64) -> (Heartbeat, Instant) {
        let start = Instant::now();
        let config = HeartbeatConfig {
            ping_interval: Duration::from_millis(10),
            pong_timeout: Duration::from_millis(timeout_ms),
        };
        (Heartbeat::new(config, start), start)
    }

    #[test]
    fn default_config_values() {
        let config = HeartbeatConfig::default();
        assert_eq!(config.ping_interval, Duration::from_secs(20));
        assert_eq!(config.pong_timeout, Duration::from_secs(20));
    }

    #[test]
    fn first_tick_sends_ping() {
        let (mut hb, start) = heartbeat(100);
        assert_eq!(hb.on_tick(start), HeartbeatAction::SendPing);
    }

    #[test]
    fn outstanding_ping_waits_until_timeout() {
        let (mut hb, start) = heartbeat(100);
        let _ = hb.on_tick(start);

        assert_eq!(
            hb.on_tick(start + Duration::from_millis(50)),
            HeartbeatAction::Wait
        );
        assert_eq!(
            hb.on_tick(start + Duration::from_millis(150)),
            HeartbeatAction::Expired {
                elapsed: Duration::from_millis(150)
            }
        );
    }

    #[test]
    fn activity_clears_outstanding_ping() {
        let (mut hb, start) = heartbeat(100);
        let _ = hb.on_tick(start);

        hb.on_activity(start + Duration::from_millis(80));
        assert_eq!(
            hb.on_tick(start + Duration::from_millis(200)),
            HeartbeatAction::SendPing
        );
    }

    #[test]
    fn idle_time_tracks_last_activity() {
        let (mut hb, start) = heartbeat(100);
        hb.on_activity(start + Duration::from_millis(30));
        assert_eq!(
            hb.idle_for(start + Duration::from_millis(100)),
            Duration::from_millis(70)
        );
    }
}
