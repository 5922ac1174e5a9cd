//! Cache Engine
//!
//! Shares one [`CacheStore`] between concurrent callers behind a single
//! coarse lock. The engine is a cheap handle: clones refer to the same cache.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheStats, CacheStore};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{CacheError, Result};

/// Thread-safe cache engine with TTL expiration and LRU eviction.
///
/// Every foreground operation takes a caller-owned [`CancellationToken`].
/// The token is checked before the lock is requested and raced against the
/// wait, so an abandoned call returns [`CacheError::Cancelled`] without
/// touching the cache.
#[derive(Debug, Clone)]
pub struct CacheEngine {
    store: Arc<RwLock<CacheStore>>,
}

impl CacheEngine {
    /// Wraps an existing store.
    pub fn new(store: CacheStore) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
        }
    }

    /// Creates an engine on the system clock with eviction enabled.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Ok(Self::new(CacheStore::new(capacity, Arc::new(SystemClock))?))
    }

    /// Creates an engine with an injected clock.
    pub fn with_clock(capacity: usize, clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self::new(CacheStore::new(capacity, clock)?))
    }

    /// Creates an engine from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = CacheStore::new(config.max_entries, Arc::new(SystemClock))?
            .with_eviction(config.eviction_enabled);
        Ok(Self::new(store))
    }

    // == Set ==
    /// Inserts or overwrites `key`. A `ttl` of `None` or zero never expires.
    pub async fn set(
        &self,
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
        ttl: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut store = self.write(cancel).await?;
        store.set(key.into(), value.into(), ttl)
    }

    // == Get ==
    /// Returns the value of a live entry and marks it most recently used.
    pub async fn get(&self, key: &str, cancel: &CancellationToken) -> Result<Vec<u8>> {
        // exclusive: a read moves the key in the LRU ranking
        let mut store = self.write(cancel).await?;
        store.get(key)
    }

    // == Delete ==
    /// Removes `key`. Returns true if a live entry was removed.
    pub async fn delete(&self, key: &str, cancel: &CancellationToken) -> Result<bool> {
        let mut store = self.write(cancel).await?;
        store.delete(key)
    }

    // == Exists ==
    /// Returns true if `key` holds a live entry. Leaves recency untouched.
    pub async fn exists(&self, key: &str, cancel: &CancellationToken) -> Result<bool> {
        let store = self.read(cancel).await?;
        store.exists(key)
    }

    // == Sweep ==
    /// Removes up to `max` expired entries in one exclusive acquisition.
    ///
    /// Gives up with [`CacheError::StoreUnavailable`] if the lock is not
    /// granted within `lock_timeout`.
    pub async fn sweep_expired(&self, max: usize, lock_timeout: Duration) -> Result<usize> {
        let mut store = tokio::time::timeout(lock_timeout, self.store.write())
            .await
            .map_err(|_| {
                CacheError::StoreUnavailable(format!(
                    "cache lock not acquired within {}ms",
                    lock_timeout.as_millis()
                ))
            })?;
        Ok(store.sweep_expired(max))
    }

    /// Returns current cache statistics.
    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    /// Returns the number of stored entries, expired ones included until reclaimed.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    pub async fn capacity(&self) -> usize {
        self.store.read().await.capacity()
    }

    /// Succeeds once shared access to the cache can be obtained.
    pub async fn health_check(&self, cancel: &CancellationToken) -> Result<()> {
        self.read(cancel).await.map(|_| ())
    }

    async fn write(&self, cancel: &CancellationToken) -> Result<RwLockWriteGuard<'_, CacheStore>> {
        if cancel.is_cancelled() {
            return Err(CacheError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CacheError::Cancelled),
            guard = self.store.write() => Ok(guard),
        }
    }

    async fn read(&self, cancel: &CancellationToken) -> Result<RwLockReadGuard<'_, CacheStore>> {
        if cancel.is_cancelled() {
            return Err(CacheError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CacheError::Cancelled),
            guard = self.store.read() => Ok(guard),
        }
    }

    #[cfg(test)]
    pub(crate) async fn lock_exclusive(&self) -> RwLockWriteGuard<'_, CacheStore> {
        self.store.write().await
    }
}
