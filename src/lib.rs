//! memstash - In-Process Key-Value Caches
//!
//! Two caches guarded by one lock per instance:
//!
//! - [`Cache`]: an unbounded concurrent map.
//! - [`TtlCache`]: entries expire after a per-entry TTL. Expired entries are
//!   dropped when read and by a background sweep every [`SWEEP_INTERVAL`].
//!
//! ```
//! use memstash::Cache;
//!
//! let cache = Cache::new();
//! cache.set("answer", 42);
//! assert_eq!(cache.get("answer"), Some(42));
//! assert_eq!(cache.pop("answer"), Some(42));
//! assert_eq!(cache.get("answer"), None);
//! ```

pub mod error;
pub mod stats;
pub mod storage;

pub use error::CacheError;
pub use stats::CacheStats;
pub use storage::{Cache, TtlCache, SWEEP_INTERVAL};
