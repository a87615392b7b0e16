//! Ticker HTTP API
//!
//! Read-only JSON endpoints over the cache facade.
//!
//! # Endpoints
//!
//! - `GET /api/tickers` - Current snapshot keyed by symbol
//! - `GET /api/tickers/{symbol}` - One record, `404` if absent
//! - `GET /api/crypto/all` - Every snapshot symbol joined with asset metadata
//! - `GET /api/crypto/{id}` - One symbol joined with asset metadata
//!
//! Handlers never touch the feed: every response is built from a single
//! `get_snapshot` call so a response never mixes two frames.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::application::services::CacheFacade;
use crate::domain::asset::{CryptoView, merge_ticker};
use crate::domain::ticker::{TickerRecord, normalize_symbol};
use crate::infrastructure::assets::AssetCatalog;

// =============================================================================
// State
// =============================================================================

/// Shared state for API handlers.
#[derive(Debug, Clone)]
pub struct ApiState {
    cache: CacheFacade,
    assets: Arc<AssetCatalog>,
}

impl ApiState {
    /// Create API state.
    #[must_use]
    pub const fn new(cache: CacheFacade, assets: Arc<AssetCatalog>) -> Self {
        Self { cache, assets }
    }
}

/// Build the API router.
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/tickers", get(tickers_handler))
        .route("/api/tickers/{symbol}", get(ticker_handler))
        .route("/api/crypto/all", get(crypto_all_handler))
        .route("/api/crypto/{id}", get(crypto_handler))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}

// =============================================================================
// Server
// =============================================================================

/// Ticker API HTTP server.
pub struct HttpServer {
    port: u16,
    state: Arc<ApiState>,
    cancel: CancellationToken,
}

impl HttpServer {
    /// Create a new API server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<ApiState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the API server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HttpServerError` if binding fails or the server encounters a
    /// fatal error while running.
    pub async fn run(self) -> Result<(), HttpServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HttpServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Ticker API listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HttpServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Ticker API stopped");
        Ok(())
    }
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn not_found(symbol: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: format!("unknown symbol: {symbol}"),
        }),
    )
        .into_response()
}

async fn tickers_handler(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let snapshot = state.cache.get_snapshot();
    let body: BTreeMap<String, TickerRecord> = snapshot
        .records()
        .iter()
        .map(|(symbol, record)| (symbol.clone(), record.clone()))
        .collect();
    Json(body)
}

async fn ticker_handler(
    State(state): State<Arc<ApiState>>,
    Path(symbol): Path<String>,
) -> Response {
    state
        .cache
        .get_record(&symbol)
        .map_or_else(|| not_found(&symbol), |record| Json(record).into_response())
}

async fn crypto_all_handler(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let snapshot = state.cache.get_snapshot();
    let views: Vec<CryptoView> = snapshot
        .symbols()
        .into_iter()
        .map(|symbol| {
            let info = state.assets.lookup(symbol);
            merge_ticker(symbol, snapshot.get(symbol), info.as_ref())
        })
        .collect();
    Json(views)
}

async fn crypto_handler(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let snapshot = state.cache.get_snapshot();
    let record = snapshot.get(&id);
    let id = record.map_or_else(|| normalize_symbol(&id), |r| r.symbol.clone());
    let info = state.assets.lookup(&id);
    Json(merge_ticker(&id, record, info.as_ref()))
}

// =============================================================================
// Errors
// =============================================================================

/// API server errors.
#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
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
