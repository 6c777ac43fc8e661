//! Key-value client abstraction.
//!
//! Session records live in a key-value store that supports per-key TTLs.
//! [`KvStore`] is the narrow async interface the session layer needs; it is
//! implemented by [`RedisKv`] for deployments and by [`InMemoryKv`] for
//! development and tests.
//!
//! Every call is expected to be safe for concurrent use without external
//! locking, and implementations bound each call with a timeout so a degraded
//! backend surfaces as [`KvError::Timeout`] rather than a stalled request.

mod memory;
#[cfg(feature = "redis")]
mod redis_kv;

use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use thiserror::Error;

pub use memory::InMemoryKv;
#[cfg(feature = "redis")]
pub use redis_kv::RedisKv;

/// Errors from a key-value backend.
///
/// A missing key is not an error; reads return `Ok(None)`.
#[derive(Debug, Error)]
pub enum KvError {
    /// The backend could not be reached or rejected the command.
    #[error("Key-value store unavailable: {reason}")]
    Unavailable {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The call did not complete within its time bound.
    #[error("Key-value {operation} timed out after {}ms", .after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl KvError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, KvError::Timeout { .. })
    }
}

/// Async key-value interface with TTL support.
#[async_trait]
pub trait KvStore: Send + Sync + Debug {
    /// Store `value` under `key` with `ttl` attached in a single operation.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError>;

    /// Read the value under `key`. Does not touch the key's TTL.
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Remove `key`; returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool, KvError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), KvError>;
}

/// Bound a backend call; an elapsed timer becomes [`KvError::Timeout`].
#[cfg_attr(not(feature = "redis"), allow(dead_code))]
pub(crate) async fn bounded<T>(
    operation: &'static str,
    limit: Duration,
    call: impl Future<Output = Result<T, KvError>>,
) -> Result<T, KvError> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(KvError::Timeout {
            operation,
            after: limit,
        }))
}
