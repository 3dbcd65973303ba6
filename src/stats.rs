//! Cache Statistics
//!
//! Per-instance operation counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Operation counters for a single cache instance
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Reads that found a live entry
    hits: AtomicU64,

    /// Reads that found nothing (or only an expired entry)
    misses: AtomicU64,

    /// Writes, including overwrites
    inserts: AtomicU64,

    /// Entries removed by `remove`/`pop`/`clear`
    removals: AtomicU64,

    /// Expired entries dropped on read
    expired: AtomicU64,

    /// Expired entries dropped by a sweep pass
    swept: AtomicU64,
}

impl CacheStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_removals(&self, count: u64) {
        self.removals.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_swept(&self, count: u64) {
        self.swept.fetch_add(count, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn inserts(&self) -> u64 {
        self.inserts.load(Ordering::Relaxed)
    }

    pub fn removals(&self) -> u64 {
        self.removals.load(Ordering::Relaxed)
    }

    pub fn expired(&self) -> u64 {
        self.expired.load(Ordering::Relaxed)
    }

    pub fn swept(&self) -> u64 {
        self.swept.load(Ordering::Relaxed)
    }

    /// Fraction of reads that were hits, 0.0 when nothing was read yet
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            return 0.0;
        }
        hits as f64 / total as f64
    }

    /// Get a summary of the counters
    pub fn summary(&self) -> String {
        format!(
            "Reads: {} hits / {} misses ({:.1}%) | Writes: {} | Removed: {} | Expired: {} lazy, {} swept",
            self.hits(),
            self.misses(),
            self.hit_ratio() * 100.0,
            self.inserts(),
            self.removals(),
            self.expired(),
            self.swept()
        )
    }
}
