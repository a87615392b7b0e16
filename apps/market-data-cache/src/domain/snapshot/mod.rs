//! Snapshot and Snapshot Store
//!
//! A [`Snapshot`] is the complete set of latest-known ticker records at one
//! instant. The [`SnapshotStore`] holds exactly one current snapshot and
//! swaps it atomically.
//!
//! # Design
//!
//! Snapshots are immutable once built and shared behind an [`Arc`]. The store
//! guards a single `Arc<Snapshot>` with a read-write lock that is held only
//! for the pointer copy or the pointer assignment, so:
//!
//! - `replace` and `current` never suspend and never wait on I/O
//! - a reader gets either the previous or the new snapshot, never a mix
//! - a reader can keep its snapshot for as long as it likes without
//!   blocking the writer

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::domain::ticker::{Symbol, TickerRecord, normalize_symbol};

// =============================================================================
// Snapshot
// =============================================================================

/// The world as of the last successfully parsed frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    records: HashMap<Symbol, TickerRecord>,
    received_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// The empty snapshot served before any frame has arrived.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from decoded records received at `received_at`.
    ///
    /// Later records win if the iterator yields the same symbol twice.
    pub fn from_records<I>(records: I, received_at: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = TickerRecord>,
    {
        let records = records
            .into_iter()
            .map(|record| (record.symbol.clone(), record))
            .collect();

        Self {
            records,
            received_at: Some(received_at),
        }
    }

    /// Look up a record by its exact key, falling back to the normalized form.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<&TickerRecord> {
        self.records
            .get(symbol)
            .or_else(|| self.records.get(&normalize_symbol(symbol)))
    }

    /// All records keyed by symbol.
    #[must_use]
    pub const fn records(&self) -> &HashMap<Symbol, TickerRecord> {
        &self.records
    }

    /// Symbols in ascending order.
    #[must_use]
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.records.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True until the first frame has been applied (or if the feed sent an
    /// empty mapping).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// When the frame behind this snapshot was received. `None` for the
    /// initial empty snapshot.
    #[must_use]
    pub const fn received_at(&self) -> Option<DateTime<Utc>> {
        self.received_at
    }

    /// Age of the snapshot relative to `now`, if it came from a frame.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.received_at.map(|at| now - at)
    }

    /// Whether the snapshot is older than `max_age` at `now`.
    ///
    /// The initial empty snapshot is never stale; it simply has no data.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: std::time::Duration) -> bool {
        self.age(now)
            .and_then(|age| age.to_std().ok())
            .is_some_and(|age| age > max_age)
    }
}

// =============================================================================
// Snapshot Store
// =============================================================================

/// Holds the current snapshot for one writer and many concurrent readers.
#[derive(Debug)]
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
    replacements: AtomicU64,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    /// Create a store holding the empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::empty())),
            replacements: AtomicU64::new(0),
        }
    }

    /// Install `snapshot` as the current snapshot.
    pub fn replace(&self, snapshot: Snapshot) {
        let next = Arc::new(snapshot);
        let previous = std::mem::replace(&mut *self.current.write(), next);
        self.replacements.fetch_add(1, Ordering::Release);
        // Last reference to a large map may be freed here, outside the lock.
        drop(previous);
    }

    /// The snapshot in effect at call time.
    #[must_use]
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    /// Number of successful replacements since construction.
    #[must_use]
    pub fn replacements(&self) -> u64 {
        self.replacements.load(Ordering::Acquire)
    }
}
