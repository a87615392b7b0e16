//! Feed Connection State
//!
//! Shared, lock-light status of the upstream connection. Written by the feed
//! event handler, read by the health and API handlers.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

/// Lifecycle state of the upstream connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedConnectionState {
    /// Opening the socket.
    Connecting,
    /// Socket open and receiving frames.
    Open,
    /// Closed by the peer or by shutdown.
    Closed,
    /// Transport error, handshake failure or heartbeat timeout.
    Failed,
}

impl FeedConnectionState {
    /// Lowercase name used in logs and health output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Failed => "failed",
        }
    }

    /// Whether the connection is currently delivering frames.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Tracking state for the upstream feed.
#[derive(Debug)]
pub struct FeedState {
    state: RwLock<FeedConnectionState>,
    last_opened_at: RwLock<Option<DateTime<Utc>>>,
    last_error: RwLock<Option<String>>,
    reconnect_attempts: AtomicU32,
    frames_received: AtomicU64,
    decode_errors: AtomicU64,
}

impl Default for FeedState {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedState {
    /// Create state for a feed that has not connected yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: RwLock::new(FeedConnectionState::Connecting),
            last_opened_at: RwLock::new(None),
            last_error: RwLock::new(None),
            reconnect_attempts: AtomicU32::new(0),
            frames_received: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
        }
    }

    /// Set the connection state. Entering `Open` clears the attempt counter
    /// and the last error.
    pub fn set_state(&self, state: FeedConnectionState) {
        *self.state.write() = state;
        if state == FeedConnectionState::Open {
            *self.last_opened_at.write() = Some(Utc::now());
            self.reconnect_attempts.store(0, Ordering::Relaxed);
            *self.last_error.write() = None;
        }
    }

    /// Mark the connection failed with a reason.
    pub fn set_failed(&self, reason: String) {
        *self.state.write() = FeedConnectionState::Failed;
        *self.last_error.write() = Some(reason);
    }

    /// Record a scheduled reconnect attempt.
    pub fn set_reconnect_attempt(&self, attempt: u32) {
        self.reconnect_attempts.store(attempt, Ordering::Relaxed);
    }

    /// Count an inbound data frame.
    pub fn increment_frames(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a frame that failed to decode.
    pub fn increment_decode_errors(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Current connection state.
    #[must_use]
    pub fn get_state(&self) -> FeedConnectionState {
        *self.state.read()
    }

    /// When the connection last entered `Open`.
    #[must_use]
    pub fn last_opened_at(&self) -> Option<DateTime<Utc>> {
        *self.last_opened_at.read()
    }

    /// Most recent failure reason, cleared on open.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Reconnect attempts since the last successful open.
    #[must_use]
    pub fn get_reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }

    /// Data frames received since start.
    #[must_use]
    pub fn get_frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    /// Frames dropped as undecodable since start.
    #[must_use]
    pub fn get_decode_errors(&self) -> u64 {
        self.decode_errors.load(Ordering::Relaxed)
    }
}
