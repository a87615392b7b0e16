//! Port Interfaces
//!
//! Seams between the feed, the snapshot store and the read path.
//!
//! ## Driven Ports (Outbound)
//!
//! - `SnapshotSink`: where the feed delivers each decoded snapshot
//!
//! ## Driver Ports (Inbound)
//!
//! - `SnapshotSource`: what the cache facade reads from

use std::sync::Arc;

use crate::domain::snapshot::{Snapshot, SnapshotStore};

/// Receives complete snapshots from the feed.
#[cfg_attr(test, mockall::automock)]
pub trait SnapshotSink: Send + Sync {
    /// Install `snapshot` as the new current snapshot.
    fn replace(&self, snapshot: Snapshot);
}

/// Provides the snapshot in effect at call time.
#[cfg_attr(test, mockall::automock)]
pub trait SnapshotSource: Send + Sync {
    /// The current snapshot. Must not block on I/O.
    fn current(&self) -> Arc<Snapshot>;
}

impl SnapshotSink for SnapshotStore {
    fn replace(&self, snapshot: Snapshot) {
        Self::replace(self, snapshot);
    }
}

impl SnapshotSource for SnapshotStore {
    fn current(&self) -> Arc<Snapshot> {
        Self::current(self)
    }
}
