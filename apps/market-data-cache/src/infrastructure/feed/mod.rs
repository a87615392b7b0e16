//! Upstream Ticker Feed Adapter
//!
//! - **client**: WebSocket connection loop with backoff and heartbeat
//! - **codec**: JSON frame → snapshot decoding
//! - **handler**: applies feed events to the snapshot store and feed state
//! - **state**: shared connection status

pub mod client;
pub mod codec;
pub mod handler;
pub mod heartbeat;
pub mod reconnect;
pub mod state;

pub use client::{ConnectionError, DEFAULT_FEED_URL, FeedClient, FeedClientConfig, FeedEvent};
pub use codec::{DecodeError, TickerCodec};
pub use handler::FeedEventHandler;
pub use heartbeat::{Heartbeat, HeartbeatAction, HeartbeatConfig};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use state::{FeedConnectionState, FeedState};
