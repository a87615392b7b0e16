//! Ticker Feed Client
//!
//! Owns the single upstream WebSocket connection. Frames are decoded into
//! full snapshots and emitted as [`FeedEvent`]s; connection lifecycle changes
//! are emitted alongside them.
//!
//! # Lifecycle
//!
//! ```text
//! Connecting ─► Open ─► (close / error / heartbeat timeout) ─► Backoff(n) ─┐
//!     ▲                                                                    │
//!     └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The loop only ends on cancellation, in which case a close frame is sent
//! before the socket is dropped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::codec::TickerCodec;
use super::heartbeat::{Heartbeat, HeartbeatAction, HeartbeatConfig};
use super::reconnect::{ReconnectConfig, ReconnectPolicy};
use crate::domain::snapshot::Snapshot;

/// Default upstream ticker endpoint.
pub const DEFAULT_FEED_URL: &str = "wss://mtickers.mtw-testnet.com/";

// =============================================================================
// Error Type
// =============================================================================

/// Reasons a connection ended. All of them lead to a reconnect.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// WebSocket transport error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Handshake did not finish in time.
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// A ping went unanswered.
    #[error("heartbeat timed out after {0:?}")]
    HeartbeatTimeout(Duration),

    /// Peer sent a close frame.
    #[error("connection closed by peer")]
    ClosedByPeer,

    /// Stream ended without a close frame.
    #[error("stream ended")]
    StreamEnded,

    /// Event receiver was dropped; nobody is listening.
    #[error("event channel closed")]
    ChannelClosed,
}

impl ConnectionError {
    /// Whether the connection ended cleanly (peer close) rather than failing.
    #[must_use]
    pub const fn is_clean_close(&self) -> bool {
        matches!(self, Self::ClosedByPeer)
    }
}

// =============================================================================
// Feed Events
// =============================================================================

/// Events emitted by the feed client.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// Opening the socket.
    Connecting,
    /// Socket open.
    Open,
    /// Connection closed cleanly.
    Closed,
    /// Connection failed.
    Failed(String),
    /// Waiting before the next attempt.
    Reconnecting {
        /// Attempt number since the last sustained open (1-based).
        attempt: u32,
        /// Delay before the attempt.
        delay: Duration,
    },
    /// A frame decoded into a full snapshot.
    Snapshot(Snapshot),
    /// A frame failed to decode and was dropped.
    DecodeError(String),
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the feed client.
#[derive(Debug, Clone)]
pub struct FeedClientConfig {
    /// Upstream WebSocket URL.
    pub url: String,
    /// Upper bound on the opening handshake.
    pub connect_timeout: Duration,
    /// Reconnection configuration.
    pub reconnect: ReconnectConfig,
    /// Heartbeat configuration.
    pub heartbeat: HeartbeatConfig,
}

impl Default for FeedClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_URL.to_string())
    }
}

impl FeedClientConfig {
    /// Create a configuration with default timings.
    #[must_use]
    pub fn new(url: String) -> Self {
        Self {
            url,
            connect_timeout: Duration::from_secs(10),
            reconnect: ReconnectConfig::default(),
            heartbeat: HeartbeatConfig::default(),
        }
    }

    /// Create configuration from `FeedSettings`.
    #[must_use]
    pub fn from_feed_settings(settings: &crate::FeedSettings) -> Self {
        Self {
            url: settings.url.clone(),
            connect_timeout: settings.connect_timeout,
            reconnect: ReconnectConfig::from_feed_settings(settings),
            heartbeat: HeartbeatConfig::from_feed_settings(settings),
        }
    }
}

// =============================================================================
// Feed Client
// =============================================================================

/// WebSocket client for the upstream ticker feed.
pub struct FeedClient {
    config: FeedClientConfig,
    codec: TickerCodec,
    event_tx: mpsc::Sender<FeedEvent>,
    cancel: CancellationToken,
}

impl FeedClient {
    /// Create a new feed client.
    #[must_use]
    pub fn new(
        config: FeedClientConfig,
        event_tx: mpsc::Sender<FeedEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            codec: TickerCodec::new(),
            event_tx,
            cancel,
        }
    }

    /// Spawn the connection loop on the current runtime.
    #[must_use]
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run the connection loop until cancelled.
    ///
    /// Failures never escape: each one is reported as an event and followed
    /// by a backoff delay and a new attempt. The loop also ends once the
    /// event receiver is gone.
    pub async fn run(self: Arc<Self>) {
        let mut policy = ReconnectPolicy::new(self.config.reconnect.clone());

        while !self.cancel.is_cancelled() {
            match self.cycle(&mut policy).await {
                Ok(true) => {}
                Ok(false) => break,
                Err(_) => {
                    tracing::warn!("Feed event receiver dropped, stopping feed client");
                    break;
                }
            }
        }

        tracing::info!("Feed client stopped");
    }

    /// One connection attempt plus its reconnect delay.
    ///
    /// Returns `Ok(false)` once cancelled and `Err(ChannelClosed)` when nobody
    /// receives events any more.
    async fn cycle(&self, policy: &mut ReconnectPolicy) -> Result<bool, ConnectionError> {
        self.emit(FeedEvent::Connecting).await?;

        let mut opened_at = None;
        let outcome = self.connect_and_run(&mut opened_at).await;

        if let Some(opened) = opened_at
            && policy.record_uptime(opened.elapsed())
        {
            tracing::debug!("Feed was stable, backoff reset");
        }

        match outcome {
            Ok(()) => return Ok(false),
            Err(ConnectionError::ChannelClosed) => return Err(ConnectionError::ChannelClosed),
            Err(e) if e.is_clean_close() => {
                tracing::info!("Feed connection closed by peer");
                self.emit(FeedEvent::Closed).await?;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Feed connection failed");
                self.emit(FeedEvent::Failed(e.to_string())).await?;
            }
        }

        let delay = policy.next_delay();
        let attempt = policy.consecutive_failures();
        tracing::info!(
            attempt,
            delay_ms = delay.as_millis(),
            "Reconnecting to ticker feed"
        );
        self.emit(FeedEvent::Reconnecting { attempt, delay }).await?;

        tokio::select! {
            () = self.cancel.cancelled() => {
                tracing::info!("Feed client cancelled during reconnect delay");
                Ok(false)
            }
            () = tokio::time::sleep(delay) => Ok(true),
        }
    }

    /// Connect and pump frames until cancellation (`Ok`) or failure (`Err`).
    ///
    /// `opened_at` is set once the handshake completes so the caller can
    /// measure uptime even when the connection later fails.
    async fn connect_and_run(&self, opened_at: &mut Option<Instant>) -> Result<(), ConnectionError> {
        tracing::info!(url = %self.config.url, "Connecting to ticker feed");

        let connect = tokio_tungstenite::connect_async(self.config.url.as_str());
        let (ws_stream, _response) = tokio::select! {
            () = self.cancel.cancelled() => return Ok(()),
            result = tokio::time::timeout(self.config.connect_timeout, connect) => {
                result.map_err(|_| ConnectionError::ConnectTimeout(self.config.connect_timeout))??
            }
        };

        let (mut write, mut read) = ws_stream.split();

        let now = Instant::now();
        *opened_at = Some(now);
        tracing::info!("Ticker feed open");
        self.emit(FeedEvent::Open).await?;

        let mut heartbeat = Heartbeat::new(self.config.heartbeat.clone(), now);
        let period = heartbeat.ping_interval();
        let mut ticker = tokio::time::interval_at((now + period).into(), period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::info!("Closing ticker feed");
                    if let Err(e) = write.close().await {
                        tracing::debug!(error = %e, "Close handshake failed");
                    }
                    return Ok(());
                }
                _ = ticker.tick() => {
                    let now = Instant::now();
                    match heartbeat.on_tick(now) {
                        HeartbeatAction::SendPing => {
                            write.send(Message::Ping(Vec::new().into())).await?;
                        }
                        HeartbeatAction::Wait => {}
                        HeartbeatAction::Expired { elapsed } => {
                            tracing::warn!(
                                elapsed_ms = elapsed.as_millis(),
                                idle_ms = heartbeat.idle_for(now).as_millis(),
                                "Heartbeat timeout"
                            );
                            return Err(ConnectionError::HeartbeatTimeout(elapsed));
                        }
                    }
                }
                msg = read.next() => {
                    let Some(msg) = msg else {
                        tracing::info!("WebSocket stream ended");
                        return Err(ConnectionError::StreamEnded);
                    };
                    let msg = msg?;
                    heartbeat.on_activity(Instant::now());

                    match msg {
                        Message::Text(text) => {
                            self.handle_frame(self.codec.decode(&text, Utc::now())).await?;
                        }
                        Message::Binary(data) => {
                            self.handle_frame(self.codec.decode_binary(&data, Utc::now())).await?;
                        }
                        Message::Ping(data) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Message::Close(frame) => {
                            tracing::info!(frame = ?frame, "Server sent close frame");
                            return Err(ConnectionError::ClosedByPeer);
                        }
                        Message::Pong(_) | Message::Frame(_) => {}
                    }
                }
            }
        }
    }

    async fn handle_frame(
        &self,
        decoded: Result<Snapshot, super::codec::DecodeError>,
    ) -> Result<(), ConnectionError> {
        match decoded {
            Ok(snapshot) => {
                tracing::trace!(symbols = snapshot.len(), "Ticker frame decoded");
                self.emit(FeedEvent::Snapshot(snapshot)).await
            }
            Err(e) => {
                tracing::warn!(error = %e, "Dropping undecodable ticker frame");
                self.emit(FeedEvent::DecodeError(e.to_string())).await
            }
        }
    }

    async fn emit(&self, event: FeedEvent) -> Result<(), ConnectionError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| ConnectionError::ChannelClosed)
    }

    /// The client configuration.
    #[must_use]
    pub const fn config(&self) -> &FeedClientConfig {
        &self.config
    }
}
