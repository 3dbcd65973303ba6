//! TTL Cache Demo
//!
//! Fills a TTL cache with short-lived entries and watches them expire.
//! Run with `RUST_LOG=memstash=trace` to see every lazy expiry.

use std::time::Duration;

use memstash::{Cache, TtlCache};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("memstash=debug".parse()?))
        .init();

    let sessions: Cache<String, u64> = Cache::new();
    for id in 0..5u64 {
        sessions.set(format!("user-{}", id), id * 100);
    }
    info!(len = sessions.len(), "Plain cache filled");
    info!(value = ?sessions.pop("user-3"), "Popped user-3");

    let tokens: TtlCache<String, String> = TtlCache::new();
    for id in 0..5u64 {
        let ttl = Duration::from_millis(200 * (id + 1));
        tokens.set(format!("token-{}", id), format!("secret-{}", id), ttl);
    }

    for round in 0..5 {
        tokio::time::sleep(Duration::from_millis(250)).await;
        let live = (0..5)
            .filter(|id| tokens.get(&format!("token-{}", id)).is_some())
            .count();
        info!(round, live, stored = tokens.len(), "TTL cache state");
    }

    info!("{}", tokens.stats().summary());
    tokens.shutdown().await?;

    Ok(())
}
