//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Asset metadata catalog.
pub mod assets;

/// Configuration loaded from the environment.
pub mod config;

/// Upstream WebSocket ticker feed.
pub mod feed;

/// Health check HTTP endpoint.
pub mod health;

/// Ticker HTTP API.
pub mod http;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// OpenTelemetry tracing integration.
pub mod telemetry;
