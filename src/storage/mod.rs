//! Storage Engine
//!
//! In-memory key-value caches, with and without TTL.

mod cache;
mod sweeper;
mod ttl_cache;

pub use cache::Cache;
pub use sweeper::SWEEP_INTERVAL;
pub use ttl_cache::TtlCache;
