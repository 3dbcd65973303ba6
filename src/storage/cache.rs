//! In-Memory Key-Value Cache
//!
//! Unbounded map behind a single mutex.

use hashbrown::HashMap;
use parking_lot::Mutex;
use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::stats::CacheStats;

struct Inner<K, V> {
    entries: Mutex<HashMap<K, V>>,
    stats: CacheStats,
}

/// Thread-safe in-memory key-value cache
///
/// Every operation holds the one instance lock for its whole critical
/// section, so operations on a cache are linearizable. Clones share the
/// same entries.
pub struct Cache<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> fmt::Debug for Cache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("len", &self.inner.entries.lock().len())
            .finish()
    }
}

impl<K: Eq + Hash, V> Default for Cache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V> Cache<K, V> {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty cache with room for `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::with_capacity(capacity)),
                stats: CacheStats::new(),
            }),
        }
    }

    /// Insert or overwrite the value for `key`
    pub fn set(&self, key: K, value: V) {
        self.inner.entries.lock().insert(key, value);
        self.inner.stats.record_insert();
    }

    /// Get a copy of the value for `key`
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let value = self.inner.entries.lock().get(key).cloned();
        match value {
            Some(_) => self.inner.stats.record_hit(),
            None => self.inner.stats.record_miss(),
        }
        value
    }

    /// Delete `key` if present
    pub fn remove<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.inner.entries.lock().remove(key).is_some() {
            self.inner.stats.record_removals(1);
        }
    }

    /// Remove `key` and return its value, in one critical section
    pub fn pop<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let value = self.inner.entries.lock().remove(key);
        match value {
            Some(_) => {
                self.inner.stats.record_hit();
                self.inner.stats.record_removals(1);
            }
            None => self.inner.stats.record_miss(),
        }
        value
    }

    /// Check if `key` is present
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.entries.lock().contains_key(key)
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry
    pub fn clear(&self) {
        let removed = {
            let mut entries = self.inner.entries.lock();
            let removed = entries.len();
            entries.clear();
            removed
        };
        self.inner.stats.record_removals(removed as u64);
    }

    /// Get all keys
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.inner.entries.lock().keys().cloned().collect()
    }

    /// Operation counters for this cache
    pub fn stats(&self) -> &CacheStats {
        &self.inner.stats
    }
}
