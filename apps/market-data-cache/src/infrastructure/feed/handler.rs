//! Feed Event Handler
//!
//! Applies [`FeedEvent`]s: snapshots go to the snapshot sink, lifecycle
//! changes go to [`FeedState`] and metrics. Decode errors are counted and
//! otherwise ignored, leaving the previous snapshot in place.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::client::FeedEvent;
use super::state::{FeedConnectionState, FeedState};
use crate::application::ports::SnapshotSink;
use crate::infrastructure::metrics;

/// Routes feed events into the store and the shared feed state.
pub struct FeedEventHandler {
    sink: Arc<dyn SnapshotSink>,
    state: Arc<FeedState>,
}

impl FeedEventHandler {
    /// Create a handler writing to `sink` and `state`.
    #[must_use]
    pub fn new(sink: Arc<dyn SnapshotSink>, state: Arc<FeedState>) -> Self {
        Self { sink, state }
    }

    /// Drain `rx` until every sender is dropped.
    pub async fn run(self, mut rx: mpsc::Receiver<FeedEvent>) {
        while let Some(event) = rx.recv().await {
            self.apply(event);
        }
        tracing::debug!("Feed event channel closed");
    }

    /// Apply a single event.
    pub fn apply(&self, event: FeedEvent) {
        match event {
            FeedEvent::Connecting => {
                self.state.set_state(FeedConnectionState::Connecting);
            }
            FeedEvent::Open => {
                self.state.set_state(FeedConnectionState::Open);
                metrics::set_feed_connected(true);
                tracing::info!("Ticker feed connected");
            }
            FeedEvent::Closed => {
                self.state.set_state(FeedConnectionState::Closed);
                metrics::set_feed_connected(false);
                tracing::warn!("Ticker feed closed");
            }
            FeedEvent::Failed(reason) => {
                metrics::set_feed_connected(false);
                metrics::record_connection_error();
                tracing::error!(error = %reason, "Ticker feed failed");
                self.state.set_failed(reason);
            }
            FeedEvent::Reconnecting { attempt, delay } => {
                self.state.set_reconnect_attempt(attempt);
                metrics::record_reconnect();
                tracing::info!(
                    attempt,
                    delay_ms = delay.as_millis(),
                    "Ticker feed reconnect scheduled"
                );
            }
            FeedEvent::Snapshot(snapshot) => {
                self.state.increment_frames();
                metrics::record_frame_received();
                metrics::set_snapshot_size(snapshot.len());
                self.sink.replace(snapshot);
                metrics::record_snapshot_replaced();
            }
            FeedEvent::DecodeError(reason) => {
                self.state.increment_frames();
                self.state.increment_decode_errors();
                metrics::record_frame_received();
                metrics::record_decode_error();
                tracing::warn!(error = %reason, "Ticker frame dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;
    use crate::application::ports::MockSnapshotSink;
    use crate::domain::snapshot::{Snapshot, SnapshotStore};
    use crate::domain::ticker::TickerRecord;

    fn snapshot(symbol: &str, price: i64) -> Snapshot {
        Snapshot::from_records(
            [TickerRecord::new(symbol, Decimal::new(price, 0), Decimal::ZERO, Utc::now())],
            Utc::now(),
        )
    }

    #[test]
    fn snapshot_event_replaces_store() {
        let store = Arc::new(SnapshotStore::new());
        let state = Arc::new(FeedState::new());
        let handler = FeedEventHandler::new(Arc::clone(&store) as Arc<dyn SnapshotSink>, Arc::clone(&state));

        handler.apply(FeedEvent::Snapshot(snapshot("BTC", 50_000)));

        assert_eq!(store.current().len(), 1);
        assert_eq!(state.get_frames_received(), 1);
    }

    #[test]
    fn decode_error_never_touches_sink() {
        let mut sink = MockSnapshotSink::new();
        sink.expect_replace().never();
        let state = Arc::new(FeedState::new());
        let handler = FeedEventHandler::new(Arc::new(sink), Arc::clone(&state));

        handler.apply(FeedEvent::DecodeError("invalid ticker frame".to_string()));

        assert_eq!(state.get_decode_errors(), 1);
        assert_eq!(state.get_frames_received(), 1);
    }

    #[test]
    fn lifecycle_events_update_state() {
        let state = Arc::new(FeedState::new());
        let handler = FeedEventHandler::new(Arc::new(SnapshotStore::new()), Arc::clone(&state));

        handler.apply(FeedEvent::Open);
        assert_eq!(state.get_state(), FeedConnectionState::Open);

        handler.apply(FeedEvent::Failed("connection reset".to_string()));
        assert_eq!(state.get_state(), FeedConnectionState::Failed);
        assert_eq!(state.last_error().as_deref(), Some("connection reset"));

        handler.apply(FeedEvent::Reconnecting {
            attempt: 2,
            delay: Duration::from_millis(1_000),
        });
        assert_eq!(state.get_reconnect_attempts(), 2);

        handler.apply(FeedEvent::Closed);
        assert_eq!(state.get_state(), FeedConnectionState::Closed);
    }

    #[tokio::test]
    async fn run_drains_channel_until_closed() {
        let store = Arc::new(SnapshotStore::new());
        let handler = FeedEventHandler::new(
            Arc::clone(&store) as Arc<dyn SnapshotSink>,
            Arc::new(FeedState::new()),
        );
        let (tx, rx) = mpsc::channel(8);

        tx.send(FeedEvent::Snapshot(snapshot("BTC", 1))).await.unwrap();
        tx.send(FeedEvent::Snapshot(snapshot("ETH", 2))).await.unwrap();
        drop(tx);

        handler.run(rx).await;

        let current = store.current();
        assert_eq!(current.symbols(), vec!["ETH"]);
        assert_eq!(store.replacements(), 2);
    }
}
