//! Prometheus Metrics Module
//!
//! Exposes cache and feed metrics in Prometheus format.
//!
//! # Metrics Categories
//!
//! - **Frames**: frames received, snapshots applied, frames dropped as undecodable
//! - **Connection**: feed connected gauge, connection errors, reconnects
//! - **Snapshot**: record count and age of the current snapshot
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port. Recording
//! functions are no-ops until [`init_metrics`] installs the recorder, so
//! tests can call them freely.

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

const FRAMES_RECEIVED: &str = "market_data_cache_frames_received_total";
const SNAPSHOTS_REPLACED: &str = "market_data_cache_snapshots_replaced_total";
const DECODE_ERRORS: &str = "market_data_cache_decode_errors_total";
const CONNECTION_ERRORS: &str = "market_data_cache_connection_errors_total";
const RECONNECTS: &str = "market_data_cache_reconnects_total";
const FEED_CONNECTED: &str = "market_data_cache_feed_connected";
const SNAPSHOT_SYMBOLS: &str = "market_data_cache_snapshot_symbols";
const SNAPSHOT_AGE: &str = "market_data_cache_snapshot_age_seconds";

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if another global recorder is already installed.
#[allow(clippy::expect_used)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

fn register_metrics() {
    describe_counter!(FRAMES_RECEIVED, "Frames received from the ticker feed");
    describe_counter!(SNAPSHOTS_REPLACED, "Frames applied as the current snapshot");
    describe_counter!(DECODE_ERRORS, "Frames dropped because they failed to decode");
    describe_counter!(CONNECTION_ERRORS, "Feed connections that ended in failure");
    describe_counter!(RECONNECTS, "Feed reconnection attempts");
    describe_gauge!(FEED_CONNECTED, "1 while the ticker feed is open, 0 otherwise");
    describe_gauge!(SNAPSHOT_SYMBOLS, "Number of symbols in the current snapshot");
    describe_gauge!(SNAPSHOT_AGE, "Seconds since the current snapshot was received");
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a frame received from the feed.
pub fn record_frame_received() {
    counter!(FRAMES_RECEIVED).increment(1);
}

/// Record a decoded frame installed as the current snapshot.
pub fn record_snapshot_replaced() {
    counter!(SNAPSHOTS_REPLACED).increment(1);
}

/// Record a frame dropped as undecodable.
pub fn record_decode_error() {
    counter!(DECODE_ERRORS).increment(1);
}

/// Record a failed feed connection.
pub fn record_connection_error() {
    counter!(CONNECTION_ERRORS).increment(1);
}

/// Record a reconnection attempt.
pub fn record_reconnect() {
    counter!(RECONNECTS).increment(1);
}

/// Update the feed connected gauge.
pub fn set_feed_connected(connected: bool) {
    gauge!(FEED_CONNECTED).set(if connected { 1.0 } else { 0.0 });
}

/// Update the snapshot size gauge.
#[allow(clippy::cast_precision_loss)]
pub fn set_snapshot_size(symbols: usize) {
    gauge!(SNAPSHOT_SYMBOLS).set(symbols as f64);
}

/// Update the snapshot age gauge.
pub fn set_snapshot_age(age_secs: f64) {
    gauge!(SNAPSHOT_AGE).set(age_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_recorder_is_a_no_op() {
        record_frame_received();
        record_snapshot_replaced();
        record_decode_error();
        record_connection_error();
        record_reconnect();
        set_feed_connected(true);
        set_snapshot_size(3);
        set_snapshot_age(1.5);
    }

    #[test]
    fn metric_names_share_prefix() {
        for name in [
            FRAMES_RECEIVED,
            SNAPSHOTS_REPLACED,
            DECODE_ERRORS,
            CONNECTION_ERRORS,
            RECONNECTS,
            FEED_CONNECTED,
            SNAPSHOT_SYMBOLS,
            SNAPSHOT_AGE,
        ] {
            assert!(name.starts_with("market_data_cache_"), "{name}");
        }
    }
}
