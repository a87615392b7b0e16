//! Cache Facade
//!
//! The sole entry point request handlers use to read ticker data. Reads are
//! side-effect free and never fail: before the first frame the facade
//! returns an empty snapshot, and while the feed is down it keeps returning
//! the last good one.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::application::ports::SnapshotSource;
use crate::domain::snapshot::Snapshot;
use crate::domain::ticker::TickerRecord;

/// Read-only view over the snapshot store.
#[derive(Clone)]
pub struct CacheFacade {
    source: Arc<dyn SnapshotSource>,
}

impl std::fmt::Debug for CacheFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheFacade").finish_non_exhaustive()
    }
}

impl CacheFacade {
    /// Wrap a snapshot source.
    #[must_use]
    pub fn new(source: Arc<dyn SnapshotSource>) -> Self {
        Self { source }
    }

    /// The current snapshot, possibly empty.
    #[must_use]
    pub fn get_snapshot(&self) -> Arc<Snapshot> {
        self.source.current()
    }

    /// A single record from the current snapshot, or `None` if the symbol is
    /// not present.
    #[must_use]
    pub fn get_record(&self, symbol: &str) -> Option<TickerRecord> {
        self.source.current().get(symbol).cloned()
    }

    /// Whether the current snapshot is older than `max_age` at `now`.
    ///
    /// The initial empty snapshot is never stale; it simply has no data.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.source.current().is_stale(now, max_age)
    }
}
