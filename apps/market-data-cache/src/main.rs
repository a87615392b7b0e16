//! Market Data Cache Binary
//!
//! Starts the live ticker cache.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin market-data-cache
//! ```
//!
//! # Environment Variables
//!
//! All optional.
//!
//! - `FEED_URL`: Upstream WebSocket URL (default: wss://mtickers.mtw-testnet.com/)
//! - `CACHE_HTTP_PORT`: Ticker API port (default: 5000)
//! - `CACHE_HEALTH_PORT`: Health check HTTP port (default: 8082)
//! - `FEED_RECONNECT_DELAY_INITIAL_MS`: First reconnect delay (default: 500)
//! - `FEED_RECONNECT_DELAY_MAX_SECS`: Reconnect delay cap (default: 30)
//! - `FEED_STABLE_PERIOD_SECS`: Uptime that resets the backoff (default: 30)
//! - `STALE_AFTER_SECS`: Snapshot age reported as degraded (default: 60)
//! - `ASSET_METADATA_PATH`: JSON file of asset metadata keyed by symbol
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4318>)
//! - `OTEL_SERVICE_NAME`: Service name (default: market-data-cache)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use market_data_cache::infrastructure::telemetry;
use market_data_cache::{
    ApiState, AssetCatalog, CacheConfig, CacheFacade, FeedClient, FeedClientConfig, FeedEvent,
    FeedEventHandler, FeedState, HealthServer, HealthServerState, HttpServer, SnapshotStore,
    init_metrics,
};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Feed event channel capacity.
const FEED_EVENT_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        return Err("failed to install rustls crypto provider".into());
    }

    load_dotenv();

    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting Market Data Cache");

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics();

    let config = CacheConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Snapshot store and read facade
    let store = Arc::new(SnapshotStore::new());
    let cache = CacheFacade::new(Arc::clone(&store) as _);
    let feed_state = Arc::new(FeedState::new());

    let assets = Arc::new(load_assets(&config));

    // Feed event handler
    let (event_tx, event_rx) = mpsc::channel::<FeedEvent>(FEED_EVENT_CAPACITY);
    let handler = FeedEventHandler::new(Arc::clone(&store) as _, Arc::clone(&feed_state));
    let handler_handle = tokio::spawn(handler.run(event_rx));

    // Feed client
    let feed_client = Arc::new(FeedClient::new(
        FeedClientConfig::from_feed_settings(&config.feed),
        event_tx,
        shutdown_token.clone(),
    ));
    tracing::debug!(
        url = %feed_client.config().url,
        connect_timeout_secs = feed_client.config().connect_timeout.as_secs(),
        "Starting feed client"
    );
    let feed_handle = feed_client.start();

    // Ticker API
    let api_state = Arc::new(ApiState::new(cache.clone(), assets));
    let http_server = HttpServer::new(
        config.server.http_port,
        api_state,
        shutdown_token.clone(),
    );
    let http_handle = tokio::spawn(async move {
        if let Err(e) = http_server.run().await {
            tracing::error!(error = %e, "Ticker API error");
        }
    });

    // Health server
    let health_state = Arc::new(HealthServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        cache,
        feed_state,
        config.stale_after,
    ));
    let health_server = HealthServer::new(
        config.server.health_port,
        health_state,
        shutdown_token.clone(),
    );
    let health_handle = tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "Health server error");
        }
    });

    tracing::info!("Market data cache ready");

    await_shutdown(shutdown_token).await;

    let drained = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
        let _ = feed_handle.await;
        let _ = handler_handle.await;
        let _ = http_handle.await;
        let _ = health_handle.await;
    })
    .await;

    if drained.is_err() {
        tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Shutdown timed out"
        );
    }

    tracing::info!("Market data cache stopped");
    Ok(())
}

/// Load asset metadata, falling back to the built-in overrides.
fn load_assets(config: &CacheConfig) -> AssetCatalog {
    let Some(path) = &config.asset_metadata_path else {
        return AssetCatalog::builtin();
    };

    match AssetCatalog::load(path) {
        Ok(catalog) => {
            tracing::info!(
                path = %path.display(),
                assets = catalog.fetched_len(),
                "Asset metadata loaded"
            );
            catalog
        }
        Err(e) => {
            tracing::warn!(error = %e, "Asset metadata unavailable, using built-in overrides");
            AssetCatalog::builtin()
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &CacheConfig) {
    tracing::info!(
        feed_url = %config.feed.url,
        http_port = config.server.http_port,
        health_port = config.server.health_port,
        stale_after_secs = config.stale_after.as_secs(),
        "Configuration loaded"
    );
    tracing::debug!(
        reconnect_initial_ms = config.feed.reconnect_delay_initial.as_millis(),
        reconnect_max_secs = config.feed.reconnect_delay_max.as_secs(),
        stable_period_secs = config.feed.stable_period.as_secs(),
        heartbeat_interval_secs = config.feed.heartbeat_interval.as_secs(),
        "Feed timings"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
