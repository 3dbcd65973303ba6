//! TTL Key-Value Cache
//!
//! Entries carry an absolute expiry. Expired entries are dropped when a read
//! touches them, and by a background sweep for entries nobody reads again.

use hashbrown::HashMap;
use parking_lot::Mutex;
use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::trace;

use super::sweeper::{Sweep, Sweeper};
use crate::error::CacheError;
use crate::stats::CacheStats;

/// Entry in the cache with value and expiration
#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    /// `None` when `now + ttl` does not fit in an `Instant`
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now().checked_add(ttl),
        }
    }

    #[inline]
    fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|t| now >= t)
    }
}

struct Shared<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    stats: CacheStats,
}

impl<K: Eq + Hash, V> Shared<K, V> {
    fn purge_expired(&self) -> usize {
        let removed = {
            let mut entries = self.entries.lock();
            let now = Instant::now();
            let before = entries.len();
            entries.retain(|_, entry| !entry.is_expired_at(now));
            before - entries.len()
        };
        self.stats.record_swept(removed as u64);
        removed
    }
}

impl<K, V> Sweep for Shared<K, V>
where
    K: Eq + Hash + Send + 'static,
    V: Send + 'static,
{
    fn sweep_expired(&self) -> usize {
        self.purge_expired()
    }
}

/// Thread-safe in-memory cache with a per-entry time-to-live
///
/// A background task started by the constructor purges expired entries
/// every [`SWEEP_INTERVAL`](super::SWEEP_INTERVAL). Clones share entries and
/// the task; the task stops when the last clone is dropped or on
/// [`shutdown`](TtlCache::shutdown).
pub struct TtlCache<K, V> {
    shared: Arc<Shared<K, V>>,
    sweeper: Arc<Sweeper>,
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            sweeper: Arc::clone(&self.sweeper),
        }
    }
}

impl<K, V> fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("len", &self.shared.entries.lock().len())
            .field("sweeper_running", &self.sweeper.is_running())
            .finish()
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash + Send + 'static,
    V: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Send + 'static,
    V: Send + 'static,
{
    /// Create a new empty cache and start its sweep task on the current
    /// Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime. Use
    /// [`new_in`](TtlCache::new_in) from plain threads.
    pub fn new() -> Self {
        Self::new_in(&Handle::current())
    }

    /// Create a new empty cache whose sweep task runs on `runtime`
    pub fn new_in(runtime: &Handle) -> Self {
        let shared = Arc::new(Shared {
            entries: Mutex::new(HashMap::new()),
            stats: CacheStats::new(),
        });
        let sweeper = Sweeper::spawn(runtime, Arc::downgrade(&shared));
        Self {
            shared,
            sweeper: Arc::new(sweeper),
        }
    }

    /// Insert or overwrite `key`, expiring `ttl` from now
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        let entry = Entry::new(value, ttl);
        self.shared.entries.lock().insert(key, entry);
        self.shared.stats.record_insert();
    }

    /// Get a copy of the value for `key`, returns None if absent or expired.
    ///
    /// An expired entry is removed by the read.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let (value, expired) = {
            let mut entries = self.shared.entries.lock();
            let now = Instant::now();
            match entries.get(key) {
                Some(entry) if !entry.is_expired_at(now) => (Some(entry.value.clone()), false),
                Some(_) => {
                    entries.remove(key);
                    (None, true)
                }
                None => (None, false),
            }
        };

        if value.is_some() {
            self.shared.stats.record_hit();
        } else {
            if expired {
                trace!("Dropped expired entry on read");
                self.shared.stats.record_expired();
            }
            self.shared.stats.record_miss();
        }
        value
    }

    /// Delete `key` whether or not it has expired
    pub fn remove<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.shared.entries.lock().remove(key).is_some() {
            self.shared.stats.record_removals(1);
        }
    }

    /// Remove `key` and return its value.
    ///
    /// A present entry is always removed, but an expired one yields None.
    pub fn pop<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let (entry, now) = {
            let mut entries = self.shared.entries.lock();
            (entries.remove(key), Instant::now())
        };
        match entry {
            Some(entry) if !entry.is_expired_at(now) => {
                self.shared.stats.record_hit();
                self.shared.stats.record_removals(1);
                Some(entry.value)
            }
            Some(_) => {
                trace!("Dropped expired entry on pop");
                self.shared.stats.record_expired();
                self.shared.stats.record_miss();
                None
            }
            None => {
                self.shared.stats.record_miss();
                None
            }
        }
    }

    /// Check if `key` holds a live entry. Does not remove expired entries.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let entries = self.shared.entries.lock();
        let now = Instant::now();
        entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    /// Time left before `key` expires, None if absent or already expired
    pub fn remaining_ttl<Q>(&self, key: &Q) -> Option<Duration>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let entries = self.shared.entries.lock();
        let now = Instant::now();
        let entry = entries.get(key)?;
        match entry.expires_at {
            Some(t) if now >= t => None,
            Some(t) => Some(t - now),
            None => Some(Duration::MAX),
        }
    }

    /// Get the number of stored entries, including expired ones not yet
    /// removed
    pub fn len(&self) -> usize {
        self.shared.entries.lock().len()
    }

    /// Check if no entries are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry
    pub fn clear(&self) {
        let removed = {
            let mut entries = self.shared.entries.lock();
            let removed = entries.len();
            entries.clear();
            removed
        };
        self.shared.stats.record_removals(removed as u64);
    }

    /// Remove expired entries now, returns count of removed entries
    pub fn cleanup_expired(&self) -> usize {
        self.shared.purge_expired()
    }

    /// Operation counters for this cache
    pub fn stats(&self) -> &CacheStats {
        &self.shared.stats
    }

    /// Check if the background sweep task is still running
    pub fn is_sweeper_running(&self) -> bool {
        self.sweeper.is_running()
    }

    /// Stop the background sweep and wait for it to exit.
    ///
    /// Affects every clone. Reads keep dropping expired entries afterwards.
    pub async fn shutdown(&self) -> Result<(), CacheError> {
        self.sweeper.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SWEEP_INTERVAL;
    use bytes::Bytes;
    use futures::future::join_all;
    use std::collections::HashMap as StdHashMap;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn test_basic_operations() {
        let cache = TtlCache::new();
        let key = Bytes::from_static(b"key");
        let value = Bytes::from_static(b"value");

        cache.set(key.clone(), value.clone(), Duration::from_secs(10));
        assert_eq!(cache.get(&key), Some(value.clone()));
        assert!(cache.contains_key(&key));

        cache.remove(&key);
        assert!(!cache.contains_key(&key));
        assert_eq!(cache.get(&key), None);

        cache.set(key.clone(), value.clone(), Duration::from_secs(10));
        assert_eq!(cache.pop(&key), Some(value));
        assert_eq!(cache.get(&key), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_missing() {
        let cache: TtlCache<String, u32> = TtlCache::new();
        assert_eq!(cache.get("missing"), None);
        assert_eq!(cache.pop("missing"), None);
        assert_eq!(cache.stats().misses(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_get_removes_entry() {
        let cache = TtlCache::new();
        cache.set("k", "v", Duration::from_millis(100));
        assert_eq!(cache.get("k"), Some("v"));

        sleep(Duration::from_millis(150)).await;

        // Still stored until something touches it
        assert_eq!(cache.len(), 1);
        assert!(!cache.contains_key("k"));
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().expired(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_pop_removes_but_misses() {
        let cache = TtlCache::new();
        cache.set("k", 1, Duration::from_millis(100));

        sleep(Duration::from_millis(150)).await;
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.pop("k"), None);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().expired(), 1);
        assert_eq!(cache.stats().removals(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_boundary() {
        let cache = TtlCache::new();
        cache.set("k", 1, Duration::from_millis(100));

        sleep(Duration::from_millis(99)).await;
        assert_eq!(cache.get("k"), Some(1));

        // Expired at exactly now == expiry
        sleep(Duration::from_millis(1)).await;
        assert_eq!(cache.get("k"), None);

        cache.set("zero", 2, Duration::ZERO);
        assert_eq!(cache.get("zero"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_ignores_expiry() {
        let cache = TtlCache::new();
        cache.set("live", 1, Duration::from_secs(5));
        cache.set("stale", 2, Duration::from_millis(1));
        sleep(Duration::from_millis(10)).await;

        cache.remove("live");
        cache.remove("stale");
        cache.remove("absent");
        assert!(cache.is_empty());
        assert_eq!(cache.stats().removals(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_resets_ttl() {
        let cache = TtlCache::new();
        cache.set("k", "v1", Duration::from_millis(50));
        cache.set("k", "v2", Duration::from_millis(200));

        sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.get("k"), Some("v2"));

        // Shorter TTL on overwrite wins too
        cache.set("j", "w1", Duration::from_secs(1));
        sleep(Duration::from_millis(500)).await;
        cache.set("j", "w2", Duration::from_millis(200));
        assert_eq!(cache.remaining_ttl("j"), Some(Duration::from_millis(200)));

        sleep(Duration::from_millis(300)).await;
        assert_eq!(cache.get("j"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_ttl() {
        let cache = TtlCache::new();
        cache.set("k", 1, Duration::from_secs(30));
        sleep(Duration::from_secs(10)).await;

        assert_eq!(cache.remaining_ttl("k"), Some(Duration::from_secs(20)));
        assert_eq!(cache.remaining_ttl("absent"), None);

        cache.set("forever", 2, Duration::MAX);
        assert_eq!(cache.remaining_ttl("forever"), Some(Duration::MAX));
        sleep(SWEEP_INTERVAL * 2).await;
        assert_eq!(cache.get("forever"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_sweep_reclaims_unread_entries() {
        let cache = TtlCache::new();
        cache.set("keep", 0, Duration::from_secs(3600));
        let before = cache.len();

        cache.set("short", 1, Duration::from_millis(10));
        assert_eq!(cache.len(), before + 1);

        sleep(SWEEP_INTERVAL + Duration::from_secs(1)).await;
        assert_eq!(cache.len(), before);
        assert_eq!(cache.stats().swept(), 1);
        assert_eq!(cache.get("keep"), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_expired() {
        let cache = TtlCache::new();
        for i in 0..10 {
            cache.set(i, i, Duration::ZERO);
        }
        cache.set(100, 100, Duration::from_secs(60));

        assert_eq!(cache.cleanup_expired(), 10);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.cleanup_expired(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown() {
        let cache = TtlCache::new();
        assert!(cache.is_sweeper_running());

        cache.shutdown().await.unwrap();
        assert!(!cache.is_sweeper_running());
        cache.shutdown().await.unwrap();

        // Lazy expiry still applies without the sweep
        cache.set("k", 1, Duration::from_millis(10));
        sleep(SWEEP_INTERVAL * 2).await;
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_drop_stops_sweeper() {
        let cache: TtlCache<u32, u32> = TtlCache::new();
        let clone = cache.clone();
        let token = cache.sweeper.token();

        drop(clone);
        assert!(!token.is_cancelled());
        assert!(cache.is_sweeper_running());

        drop(cache);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_new_in_outside_runtime() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        let cache = TtlCache::new_in(runtime.handle());
        cache.set("k", 1, Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_access() {
        let cache: TtlCache<(usize, usize), usize> = TtlCache::new();

        let tasks = (0..8).map(|t| {
            let c = cache.clone();
            tokio::spawn(async move {
                let mut expected = StdHashMap::new();
                for i in 0..1000 {
                    let key = (t, i % 16);
                    if i % 3 == 2 {
                        c.remove(&key);
                        expected.remove(&key);
                    } else {
                        c.set(key, i, Duration::from_secs(3600));
                        expected.insert(key, i);
                    }
                    assert_eq!(c.get(&key), expected.get(&key).copied());
                }
                expected
            })
        });

        let mut expected = StdHashMap::new();
        for result in join_all(tasks).await {
            expected.extend(result.unwrap());
        }

        assert_eq!(cache.len(), expected.len());
        for (key, value) in expected {
            assert_eq!(cache.get(&key), Some(value));
        }
    }
}
