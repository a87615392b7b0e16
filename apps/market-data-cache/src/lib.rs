#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Market Data Cache - Live Ticker Snapshot Service
//!
//! Maintains a single connection to an upstream real-time ticker feed and
//! keeps the latest complete snapshot in memory. HTTP readers are served
//! from that snapshot and never wait on the feed.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core ticker types and the snapshot store
//!   - `ticker`: Per-instrument records
//!   - `snapshot`: Immutable snapshots and the atomic store
//!   - `asset`: Asset metadata and the merged ticker view
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Snapshot sink (written by the feed) and source (read by HTTP)
//!   - `services`: The cache facade
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `feed`: WebSocket client, frame codec, reconnection, heartbeat
//!   - `http`: Ticker JSON API
//!   - `health`: Health check and metrics endpoint
//!   - `assets`: Asset metadata catalog
//!   - `config`: Environment configuration
//!
//! # Data Flow
//!
//! ```text
//!                 ┌────────────┐  FeedEvent  ┌──────────────┐  replace
//! Ticker feed WS ─►│ FeedClient │────mpsc────►│ EventHandler │──────────┐
//!                 └────────────┘             └──────────────┘          ▼
//!                                                              ┌───────────────┐
//!                         HTTP readers ◄── CacheFacade ◄───────│ SnapshotStore │
//!                                                   current    └───────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core ticker types with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::asset::{AssetInfo, CryptoView};
pub use domain::snapshot::{Snapshot, SnapshotStore};
pub use domain::ticker::{Symbol, TickerRecord};

// Application
pub use application::ports::{SnapshotSink, SnapshotSource};
pub use application::services::CacheFacade;

// Infrastructure config
pub use infrastructure::config::{CacheConfig, ConfigError, FeedSettings, ServerSettings};

// Feed
pub use infrastructure::feed::{
    FeedClient, FeedClientConfig, FeedEvent, FeedEventHandler, FeedState, ReconnectConfig,
    ReconnectPolicy,
};

// Servers
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};
pub use infrastructure::http::{ApiState, HttpServer, HttpServerError};

// Asset metadata
pub use infrastructure::assets::{AssetCatalog, AssetCatalogError};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
