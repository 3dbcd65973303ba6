//! Error types

use thiserror::Error;

/// Errors surfaced by cache lifecycle operations.
///
/// Lookups never fail; a missing key is `None`.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The background sweep task panicked or was torn down with its runtime
    #[error("sweep task failed: {0}")]
    Sweeper(#[from] tokio::task::JoinError),
}
