//! Redis-backed Storage
//!
//! Satisfies the [`Storage`] contract against a remote Redis server. Expiration,
//! eviction and persistence are then the server's business.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError, RedisResult};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::Storage;
use crate::cache::validate_key;
use crate::error::{CacheError, Result};

/// Remote store reached through a multiplexed, auto-reconnecting connection.
#[derive(Clone)]
pub struct RedisStorage {
    conn: ConnectionManager,
}

impl RedisStorage {
    /// Connects to `url`, e.g. `redis://localhost:6379/0`.
    ///
    /// A malformed URL is an `InvalidArgument`; an unreachable server is
    /// `StoreUnavailable`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| CacheError::InvalidArgument(format!("Invalid store URL: {e}")))?;
        let conn = ConnectionManager::new(client).await.map_err(unavailable)?;

        info!(backend = "redis", "Connected to remote store");
        Ok(Self { conn })
    }

    async fn run<T, F>(&self, cancel: &CancellationToken, command: F) -> Result<T>
    where
        F: Future<Output = RedisResult<T>> + Send,
    {
        if cancel.is_cancelled() {
            return Err(CacheError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CacheError::Cancelled),
            result = command => result.map_err(unavailable),
        }
    }
}

fn unavailable(err: RedisError) -> CacheError {
    CacheError::StoreUnavailable(err.to_string())
}

#[async_trait]
impl Storage for RedisStorage {
    async fn put(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        validate_key(key)?;
        let mut conn = self.conn.clone();

        match ttl.filter(|ttl| !ttl.is_zero()) {
            Some(ttl) => {
                let millis = ttl_millis(ttl);
                self.run(cancel, async move {
                    let _: () = conn.pset_ex(key, value, millis).await?;
                    Ok::<(), RedisError>(())
                })
                .await
            }
            None => {
                self.run(cancel, async move {
                    let _: () = conn.set(key, value).await?;
                    Ok::<(), RedisError>(())
                })
                .await
            }
        }
    }

    async fn fetch(&self, key: &str, cancel: &CancellationToken) -> Result<Vec<u8>> {
        validate_key(key)?;
        let mut conn = self.conn.clone();

        let value = self
            .run(cancel, async move {
                let value: Option<Vec<u8>> = conn.get(key).await?;
                Ok::<_, RedisError>(value)
            })
            .await?;

        value.ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    async fn remove(&self, key: &str, cancel: &CancellationToken) -> Result<()> {
        validate_key(key)?;
        let mut conn = self.conn.clone();

        self.run(cancel, async move {
            let _: i64 = conn.del(key).await?;
            Ok::<(), RedisError>(())
        })
        .await
    }

    async fn contains(&self, key: &str, cancel: &CancellationToken) -> Result<bool> {
        validate_key(key)?;
        let mut conn = self.conn.clone();

        self.run(cancel, async move {
            let exists: bool = conn.exists(key).await?;
            Ok::<_, RedisError>(exists)
        })
        .await
    }

    async fn health_check(&self, cancel: &CancellationToken) -> Result<()> {
        let mut conn = self.conn.clone();

        self.run(cancel, async move {
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<(), RedisError>(())
        })
        .await
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

/// PSETEX milliseconds: at least 1, saturating at `u64::MAX`.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis().max(1)).unwrap_or(u64::MAX)
}
