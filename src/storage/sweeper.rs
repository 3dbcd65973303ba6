//! Background Sweep
//!
//! Task that periodically removes expired entries from a TTL cache.

use parking_lot::Mutex;
use std::sync::Weak;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::CacheError;

/// How often a TTL cache purges expired entries in the background
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// State that can drop its own expired entries
pub(crate) trait Sweep: Send + Sync + 'static {
    /// Remove expired entries, returns count of removed entries
    fn sweep_expired(&self) -> usize;
}

/// Owned handle to a running sweep task.
///
/// Dropping the handle cancels the task.
pub(crate) struct Sweeper {
    token: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Sweeper {
    /// Spawn a sweep task for `target` on `runtime`
    pub(crate) fn spawn<S: Sweep>(runtime: &Handle, target: Weak<S>) -> Self {
        let token = CancellationToken::new();
        let handle = runtime.spawn(run(target, token.clone()));
        Self {
            token,
            handle: Mutex::new(Some(handle)),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Cancel the task and wait for it to exit
    pub(crate) async fn shutdown(&self) -> Result<(), CacheError> {
        self.token.cancel();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            handle.await?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run<S: Sweep>(target: Weak<S>, token: CancellationToken) {
    let mut ticker = interval_at(Instant::now() + SWEEP_INTERVAL, SWEEP_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("TTL sweeper started, interval: {:?}", SWEEP_INTERVAL);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                // Cache state already released
                let Some(target) = target.upgrade() else {
                    break;
                };
                let removed = target.sweep_expired();
                if removed > 0 {
                    debug!(removed = removed, "Swept expired entries");
                }
            }
        }
    }

    info!("TTL sweeper stopped");
}
