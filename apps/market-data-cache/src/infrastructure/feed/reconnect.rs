//! Reconnection Policy
//!
//! Exponential backoff for the feed connection:
//!
//! ```text
//! delay(n) = min(initial_delay * multiplier^n, max_delay)
//! ```
//!
//! `n` counts consecutive failures. It drops back to zero once a connection
//! has stayed open for at least `stable_period`, so a single blip after hours
//! of uptime retries quickly while a flapping endpoint backs off to the cap.
//! The policy never gives up.

use std::time::Duration;

use rand::Rng;

/// Configuration for reconnection behavior.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any delay, jitter included.
    pub max_delay: Duration,
    /// Growth factor per consecutive failure.
    pub multiplier: f64,
    /// Jitter as a fraction of the delay (0.1 = ±10%). Zero disables jitter.
    pub jitter_factor: f64,
    /// Uptime after which the failure counter resets.
    pub stable_period: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter_factor: 0.0,
            stable_period: Duration::from_secs(30),
        }
    }
}

impl ReconnectConfig {
    /// Create configuration from `FeedSettings`.
    #[must_use]
    pub const fn from_feed_settings(settings: &crate::FeedSettings) -> Self {
        Self {
            initial_delay: settings.reconnect_delay_initial,
            max_delay: settings.reconnect_delay_max,
            multiplier: 2.0,
            jitter_factor: settings.reconnect_jitter,
            stable_period: settings.stable_period,
        }
    }

    /// Un-jittered delay after `failures` consecutive failures.
    #[must_use]
    pub fn base_delay(&self, failures: u32) -> Duration {
        #[allow(clippy::cast_precision_loss)]
        let initial_millis = self.initial_delay.as_millis() as f64;
        #[allow(clippy::cast_precision_loss)]
        let max_millis = self.max_delay.as_millis() as f64;

        let exponent = i32::try_from(failures).unwrap_or(i32::MAX);
        let scaled = initial_millis * self.multiplier.powi(exponent);

        if !scaled.is_finite() || scaled >= max_millis {
            return self.max_delay;
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let millis = scaled.max(0.0).round() as u64;
        Duration::from_millis(millis)
    }
}

/// Backoff state for one feed connection.
///
/// # Example
///
/// ```rust
/// use market_data_cache::infrastructure::feed::reconnect::{ReconnectConfig, ReconnectPolicy};
/// use std::time::Duration;
///
/// let mut policy = ReconnectPolicy::new(ReconnectConfig::default());
///
/// let first = policy.next_delay();
/// let second = policy.next_delay();
/// assert!(second >= first);
///
/// // A connection that stayed up long enough clears the backoff.
/// policy.record_uptime(Duration::from_secs(60));
/// assert_eq!(policy.consecutive_failures(), 0);
/// ```
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    consecutive_failures: u32,
}

impl ReconnectPolicy {
    /// Create a new reconnection policy.
    #[must_use]
    pub const fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            consecutive_failures: 0,
        }
    }

    /// Delay to wait before the next attempt. Counts one more failure.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.config.base_delay(self.consecutive_failures);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.apply_jitter(base).min(self.config.max_delay)
    }

    /// Report how long the last connection stayed open.
    ///
    /// Returns `true` if the uptime was long enough to reset the backoff.
    pub fn record_uptime(&mut self, uptime: Duration) -> bool {
        if uptime >= self.config.stable_period {
            self.reset();
            true
        } else {
            false
        }
    }

    /// Clear the failure counter.
    pub const fn reset(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Number of failures since the last reset.
    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// The policy configuration.
    #[must_use]
    pub const fn config(&self) -> &ReconnectConfig {
        &self.config
    }

    fn apply_jitter(&self, duration: Duration) -> Duration {
        if self.config.jitter_factor <= 0.0 {
            return duration;
        }

        #[allow(clippy::cast_precision_loss)]
        let base_millis = duration.as_millis() as f64;
        let jitter_range = base_millis * self.config.jitter_factor;
        let jitter: f64 = rand::rng().random_range(-jitter_range..=jitter_range);
        let adjusted_millis = (base_millis + jitter).max(1.0);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let adjusted_u64 = adjusted_millis as u64;
        Duration::from_millis(adjusted_u64)
    }
}
