//! Health Check and Metrics Endpoint
//!
//! HTTP endpoint for health checks, feed status reporting, and Prometheus metrics.
//! Used by container orchestrators, load balancers, and monitoring systems.
//!
//! # Endpoints
//!
//! - `GET /health` - Returns JSON health status
//! - `GET /healthz` - Kubernetes liveness probe (simple OK)
//! - `GET /readyz` - Kubernetes readiness probe (ready once a snapshot exists)
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::services::CacheFacade;
use crate::domain::snapshot::Snapshot;
use crate::infrastructure::feed::{FeedConnectionState, FeedState};
use crate::infrastructure::metrics::{get_metrics_handle, set_snapshot_age};

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy", "degraded", or "unhealthy".
    pub status: HealthStatus,
    /// Service version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Upstream feed status.
    pub feed: FeedInfo,
    /// Current snapshot status.
    pub snapshot: SnapshotInfo,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Feed open and snapshot fresh.
    Healthy,
    /// Serving data, but the feed is down or the data is stale.
    Degraded,
    /// No data to serve and no feed to get it from.
    Unhealthy,
}

/// Feed connection status.
#[derive(Debug, Clone, Serialize)]
pub struct FeedInfo {
    /// Connection state.
    pub state: FeedConnectionState,
    /// Whether the feed is open.
    pub connected: bool,
    /// Frames received count.
    pub frames_received: u64,
    /// Frames dropped as undecodable.
    pub decode_errors: u64,
    /// Current reconnect attempt (0 while open).
    pub reconnect_attempts: u32,
    /// When the current or most recent connection opened.
    pub last_opened_at: Option<DateTime<Utc>>,
    /// Reason for the most recent failure.
    pub last_error: Option<String>,
}

/// Current snapshot status.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotInfo {
    /// Number of symbols.
    pub symbols: usize,
    /// When the snapshot was received, `None` before the first frame.
    pub received_at: Option<DateTime<Utc>>,
    /// Seconds since the snapshot was received.
    pub age_secs: Option<f64>,
    /// Whether the snapshot is older than the staleness threshold.
    pub stale: bool,
}

// =============================================================================
// Health Server State
// =============================================================================

/// Shared state for the health server.
pub struct HealthServerState {
    version: String,
    started_at: Instant,
    cache: CacheFacade,
    feed_state: Arc<FeedState>,
    stale_after: Duration,
}

impl HealthServerState {
    /// Create new health server state.
    #[must_use]
    pub fn new(
        version: String,
        cache: CacheFacade,
        feed_state: Arc<FeedState>,
        stale_after: Duration,
    ) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            cache,
            feed_state,
            stale_after,
        }
    }
}

// =============================================================================
// Health Server
// =============================================================================

/// Health check HTTP server.
pub struct HealthServer {
    port: u16,
    state: Arc<HealthServerState>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Create a new health server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<HealthServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the health server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HealthServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HealthServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HealthServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Health server listening");

        axum::serve(listener, health_router(self.state))
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HealthServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Health server stopped");
        Ok(())
    }
}

/// Build the health router.
pub fn health_router(state: Arc<HealthServerState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn health_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let response = build_health_response(&state, Utc::now());
    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    if state.cache.get_snapshot().received_at().is_some() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    if let Some(age) = snapshot_age_secs(&state.cache.get_snapshot(), Utc::now()) {
        set_snapshot_age(age);
    }

    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

#[allow(clippy::cast_precision_loss)]
fn snapshot_age_secs(snapshot: &Snapshot, now: DateTime<Utc>) -> Option<f64> {
    snapshot
        .age(now)
        .map(|age| age.num_milliseconds().max(0) as f64 / 1000.0)
}

fn snapshot_info(snapshot: &Snapshot, now: DateTime<Utc>, stale_after: Duration) -> SnapshotInfo {
    SnapshotInfo {
        symbols: snapshot.len(),
        received_at: snapshot.received_at(),
        age_secs: snapshot_age_secs(snapshot, now),
        stale: snapshot.is_stale(now, stale_after),
    }
}

fn build_health_response(state: &HealthServerState, now: DateTime<Utc>) -> HealthResponse {
    let snapshot = state.cache.get_snapshot();
    let feed = feed_state_to_info(&state.feed_state);

    let snapshot_info = snapshot_info(&snapshot, now, state.stale_after);

    let status = determine_health_status(&feed, &snapshot_info);

    HealthResponse {
        status,
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: now,
        feed,
        snapshot: snapshot_info,
    }
}

fn feed_state_to_info(state: &FeedState) -> FeedInfo {
    let connection_state = state.get_state();

    FeedInfo {
        state: connection_state,
        connected: connection_state.is_open(),
        frames_received: state.get_frames_received(),
        decode_errors: state.get_decode_errors(),
        reconnect_attempts: state.get_reconnect_attempts(),
        last_opened_at: state.last_opened_at(),
        last_error: state.last_error(),
    }
}

fn determine_health_status(feed: &FeedInfo, snapshot: &SnapshotInfo) -> HealthStatus {
    let has_data = snapshot.received_at.is_some();

    match (feed.connected, has_data) {
        (false, false) => HealthStatus::Unhealthy,
        (true, _) if !snapshot.stale => HealthStatus::Healthy,
        _ => HealthStatus::Degraded,
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Health server errors.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================
