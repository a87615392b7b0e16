//! Application Layer - Ports and the cache read service.
//!
//! Defines how the feed and the HTTP surface reach the snapshot store
//! without depending on each other.

/// Port interfaces between the feed, the store and readers.
pub mod ports;

/// Application services (the cache facade).
pub mod services;
