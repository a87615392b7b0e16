//! Domain Layer - Core ticker types and the snapshot store.
//!
//! Pure types with no I/O. The snapshot store is the only shared mutable
//! state in the service.

/// Asset metadata and the merged ticker view.
pub mod asset;

/// Snapshot and the atomic snapshot store.
pub mod snapshot;

/// Per-instrument ticker records.
pub mod ticker;
