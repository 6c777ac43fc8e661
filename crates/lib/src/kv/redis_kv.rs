//! Redis-backed key-value store.

use std::time::Duration;

use async_trait::async_trait;
use redis::{Client, RedisError, aio::ConnectionManager};

use super::{KvError, KvStore, bounded};
use crate::config::redact_url;

impl From<RedisError> for KvError {
    fn from(e: RedisError) -> Self {
        KvError::Unavailable {
            reason: e.to_string(),
            source: Some(Box::new(e)),
        }
    }
}

/// [`KvStore`] over a multiplexed Redis connection.
///
/// The connection manager is cloned per call; clones share one multiplexed
/// connection and reconnect transparently, so no lock is held across calls.
#[derive(Clone)]
pub struct RedisKv {
    manager: ConnectionManager,
    operation_timeout: Duration,
    display_url: String,
}

impl std::fmt::Debug for RedisKv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisKv")
            .field("url", &self.display_url)
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

impl RedisKv {
    /// Connect and verify the server answers `PING`.
    pub async fn connect(
        url: &str,
        connect_timeout: Duration,
        operation_timeout: Duration,
    ) -> Result<Self, KvError> {
        let display_url = redact_url(url);
        tracing::info!("Connecting to Redis at {display_url}");

        let client = Client::open(url)?;
        let manager = bounded("connect", connect_timeout, async {
            ConnectionManager::new(client).await.map_err(KvError::from)
        })
        .await?;

        let kv = Self {
            manager,
            operation_timeout,
            display_url,
        };
        bounded("ping", connect_timeout, kv.ping_inner()).await?;
        tracing::info!("Connected to Redis");
        Ok(kv)
    }

    async fn ping_inner(&self) -> Result<(), KvError> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for RedisKv {
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        // SET .. EX writes the value and its expiry atomically
        let seconds = ttl.as_secs().max(1);
        let mut conn = self.manager.clone();
        bounded("set", self.operation_timeout, async {
            let _: () = redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(seconds)
                .query_async(&mut conn)
                .await?;
            Ok::<_, KvError>(())
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut conn = self.manager.clone();
        bounded("get", self.operation_timeout, async {
            let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
            Ok::<_, KvError>(value)
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool, KvError> {
        let mut conn = self.manager.clone();
        bounded("delete", self.operation_timeout, async {
            let removed: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
            Ok::<_, KvError>(removed > 0)
        })
        .await
    }

    async fn ping(&self) -> Result<(), KvError> {
        bounded("ping", self.operation_timeout, self.ping_inner()).await
    }
}
