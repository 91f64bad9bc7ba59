//! Key-value storage for rate-limit window counters.
//!
//! # Data Flow
//! ```text
//! RateLimiter
//!     → counter.rs (WindowCounterStore: integer get/put with fixed TTL)
//!     → KvStore trait
//!         → memory.rs (DashMap, per-instance)
//!         → redis_store.rs (shared across instances)
//! ```
//!
//! # Design Decisions
//! - The store only offers get and put-with-expiry; increments are
//!   read-then-write and may under-count under contention
//! - Store failures surface as errors; the caller decides how to fail

pub mod counter;
pub mod memory;
pub mod redis_store;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::config::{StoreBackend, StoreConfig};

pub use counter::WindowCounterStore;
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Errors raised by a counter store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or rejected the command.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored counter is not a decimal integer.
    #[error("counter at '{key}' holds non-integer value '{value}'")]
    InvalidCounter { key: String, value: String },
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A string key-value store with per-entry expiry.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Return the value at `key`, or `None` if never set or expired.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store `value` at `key`, replacing any prior value, expiring after `ttl`.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;
}

/// Build the configured store backend.
///
/// The memory backend starts its sweeper, which stops on `shutdown`.
pub fn build_store(
    config: &StoreConfig,
    shutdown: broadcast::Receiver<()>,
) -> StoreResult<Arc<dyn KvStore>> {
    match config.backend {
        StoreBackend::Memory => {
            let store = MemoryStore::new();
            store.spawn_sweeper(Duration::from_secs(config.sweep_interval_secs), shutdown);
            tracing::info!("Using in-memory counter store");
            Ok(Arc::new(store))
        }
        StoreBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .ok_or_else(|| StoreError::Unavailable("store.redis_url not set".into()))?;
            let store = RedisStore::open(url)?;
            tracing::info!("Using redis counter store");
            Ok(Arc::new(store))
        }
    }
}
