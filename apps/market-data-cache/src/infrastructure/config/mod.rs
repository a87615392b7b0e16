//! Configuration Module
//!
//! Environment-driven configuration for the cache service.

mod settings;

pub use settings::{CacheConfig, ConfigError, FeedSettings, ServerSettings};
