//! Storage Module
//!
//! The narrow key-value contract consumed by [`crate::user::UserCache`] and the
//! HTTP layer. The in-process [`CacheEngine`] satisfies it directly; a remote
//! store can satisfy it behind the `redis-store` feature.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::cache::CacheStats;
use crate::engine::CacheEngine;
use crate::error::Result;

#[cfg(feature = "redis-store")]
mod redis_store;

#[cfg(feature = "redis-store")]
pub use redis_store::RedisStorage;

/// Key-value backing store.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Stores `value` under `key`; `None` or zero `ttl` never expires.
    async fn put(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Fails with `NotFound` if the key is absent or expired.
    async fn fetch(&self, key: &str, cancel: &CancellationToken) -> Result<Vec<u8>>;

    /// Removing an absent key succeeds.
    async fn remove(&self, key: &str, cancel: &CancellationToken) -> Result<()>;

    async fn contains(&self, key: &str, cancel: &CancellationToken) -> Result<bool>;

    async fn health_check(&self, cancel: &CancellationToken) -> Result<()>;

    /// Hit, miss and eviction counters, when the backend keeps them.
    async fn stats(&self) -> Option<CacheStats> {
        None
    }

    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;
}

#[async_trait]
impl Storage for CacheEngine {
    async fn put(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.set(key, value, ttl, cancel).await
    }

    async fn fetch(&self, key: &str, cancel: &CancellationToken) -> Result<Vec<u8>> {
        self.get(key, cancel).await
    }

    async fn remove(&self, key: &str, cancel: &CancellationToken) -> Result<()> {
        self.delete(key, cancel).await.map(|_| ())
    }

    async fn contains(&self, key: &str, cancel: &CancellationToken) -> Result<bool> {
        self.exists(key, cancel).await
    }

    async fn health_check(&self, cancel: &CancellationToken) -> Result<()> {
        CacheEngine::health_check(self, cancel).await
    }

    async fn stats(&self) -> Option<CacheStats> {
        Some(CacheEngine::stats(self).await)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_engine_through_trait_object() {
        let store: Arc<dyn Storage> = Arc::new(CacheEngine::with_capacity(4).unwrap());
        let cancel = CancellationToken::new();

        store.put("k", b"v".to_vec(), None, &cancel).await.unwrap();
        assert!(store.contains("k", &cancel).await.unwrap());
        assert_eq!(store.fetch("k", &cancel).await.unwrap(), b"v");

        store.remove("k", &cancel).await.unwrap();
        store.remove("k", &cancel).await.unwrap();
        assert!(matches!(
            store.fetch("k", &cancel).await,
            Err(CacheError::NotFound(_))
        ));

        store.health_check(&cancel).await.unwrap();
        assert_eq!(store.backend(), "memory");
        assert_eq!(store.stats().await.unwrap().hits, 1);
    }
}
