//! Cache Configuration Settings
//!
//! Configuration types for the cache service, loaded from environment
//! variables. Every setting has a default; only malformed values that would
//! leave the service unable to run are rejected.

use std::path::PathBuf;
use std::time::Duration;

use crate::infrastructure::feed::DEFAULT_FEED_URL;

/// Upstream feed settings.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    /// Upstream WebSocket URL (`ws://` or `wss://`).
    pub url: String,
    /// Upper bound on the opening handshake.
    pub connect_timeout: Duration,
    /// Heartbeat ping interval.
    pub heartbeat_interval: Duration,
    /// Heartbeat timeout before considering the connection dead.
    pub heartbeat_timeout: Duration,
    /// Delay before the first reconnection attempt.
    pub reconnect_delay_initial: Duration,
    /// Maximum reconnection delay.
    pub reconnect_delay_max: Duration,
    /// Reconnection jitter as a fraction of the delay.
    pub reconnect_jitter: f64,
    /// Uptime after which the backoff resets.
    pub stable_period: Duration,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(20),
            heartbeat_timeout: Duration::from_secs(20),
            reconnect_delay_initial: Duration::from_millis(500),
            reconnect_delay_max: Duration::from_secs(30),
            reconnect_jitter: 0.0,
            stable_period: Duration::from_secs(30),
        }
    }
}

/// Server port settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Ticker API HTTP port.
    pub http_port: u16,
    /// Health check and metrics HTTP port.
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            http_port: 5000,
            health_port: 8082,
        }
    }
}

/// Complete cache service configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Upstream feed settings.
    pub feed: FeedSettings,
    /// Server port settings.
    pub server: ServerSettings,
    /// Snapshot age after which health reports degraded.
    pub stale_after: Duration,
    /// Optional JSON file with asset metadata keyed by symbol.
    pub asset_metadata_path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            feed: FeedSettings::default(),
            server: ServerSettings::default(),
            stale_after: Duration::from_secs(60),
            asset_metadata_path: None,
        }
    }
}

impl CacheConfig {
    /// Create configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `FEED_URL` is not a WebSocket URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if `FEED_URL` is not a WebSocket URL.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };
        let defaults = Self::default();

        let url = env
            .string("FEED_URL")
            .unwrap_or_else(|| defaults.feed.url.clone());
        validate_ws_url(&url)?;

        let feed = FeedSettings {
            url,
            connect_timeout: env.secs("FEED_CONNECT_TIMEOUT_SECS", defaults.feed.connect_timeout),
            heartbeat_interval: env.secs(
                "FEED_HEARTBEAT_INTERVAL_SECS",
                defaults.feed.heartbeat_interval,
            ),
            heartbeat_timeout: env.secs(
                "FEED_HEARTBEAT_TIMEOUT_SECS",
                defaults.feed.heartbeat_timeout,
            ),
            reconnect_delay_initial: env.millis(
                "FEED_RECONNECT_DELAY_INITIAL_MS",
                defaults.feed.reconnect_delay_initial,
            ),
            reconnect_delay_max: env.secs(
                "FEED_RECONNECT_DELAY_MAX_SECS",
                defaults.feed.reconnect_delay_max,
            ),
            reconnect_jitter: env
                .parse("FEED_RECONNECT_JITTER", defaults.feed.reconnect_jitter)
                .clamp(0.0, 1.0),
            stable_period: env.secs("FEED_STABLE_PERIOD_SECS", defaults.feed.stable_period),
        };

        let server = ServerSettings {
            http_port: env.parse("CACHE_HTTP_PORT", defaults.server.http_port),
            health_port: env.parse("CACHE_HEALTH_PORT", defaults.server.health_port),
        };

        Ok(Self {
            feed,
            server,
            stale_after: env.secs("STALE_AFTER_SECS", defaults.stale_after),
            asset_metadata_path: env.string("ASSET_METADATA_PATH").map(PathBuf::from),
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Feed URL does not use a WebSocket scheme.
    #[error("FEED_URL must start with ws:// or wss://, got {0:?}")]
    InvalidFeedUrl(String),
}

fn validate_ws_url(url: &str) -> Result<(), ConfigError> {
    let rest = url
        .strip_prefix("wss://")
        .or_else(|| url.strip_prefix("ws://"));

    match rest {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(ConfigError::InvalidFeedUrl(url.to_string())),
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.string(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn secs(&self, key: &str, default: Duration) -> Duration {
        self.string(key)
            .and_then(|v| v.parse::<u64>().ok())
            .map_or(default, Duration::from_secs)
    }

    fn millis(&self, key: &str, default: Duration) -> Duration {
        self.string(key)
            .and_then(|v| v.parse::<u64>().ok())
            .map_or(default, Duration::from_millis)
    }
}
