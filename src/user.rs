//! User Cache
//!
//! Namespaces user records under `user:<id>` on top of any [`Storage`].

use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::storage::Storage;

const USER_KEY_PREFIX: &str = "user:";

/// User cache settings.
#[derive(Debug, Clone, Copy)]
pub struct UserCacheConfig {
    /// Lifetime of a cached user
    pub ttl: Duration,
}

impl Default for UserCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
        }
    }
}

impl From<&Config> for UserCacheConfig {
    fn from(config: &Config) -> Self {
        Self {
            ttl: config.user_ttl,
        }
    }
}

/// Caches serialized user records for a fixed TTL.
#[derive(Clone)]
pub struct UserCache {
    store: Arc<dyn Storage>,
    config: UserCacheConfig,
}

impl UserCache {
    /// Creates a user cache with the default one hour TTL.
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self::with_config(store, UserCacheConfig::default())
    }

    pub fn with_config(store: Arc<dyn Storage>, config: UserCacheConfig) -> Self {
        Self { store, config }
    }

    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Stores `data` for `user_id`, replacing any previous record.
    pub async fn cache_user(
        &self,
        user_id: &str,
        data: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let key = user_key(user_id)?;
        self.store
            .put(&key, data.as_bytes().to_vec(), Some(self.config.ttl), cancel)
            .await?;
        debug!(user_id, "Cached user");
        Ok(())
    }

    /// Returns the cached record, `NotFound` if absent or expired.
    pub async fn get_user(&self, user_id: &str, cancel: &CancellationToken) -> Result<String> {
        let key = user_key(user_id)?;
        let bytes = self.store.fetch(&key, cancel).await?;
        String::from_utf8(bytes)
            .map_err(|e| CacheError::Serialization(format!("user {user_id} is not UTF-8: {e}")))
    }

    /// Drops the cached record. Invalidating an uncached user succeeds.
    pub async fn invalidate_user(&self, user_id: &str, cancel: &CancellationToken) -> Result<()> {
        let key = user_key(user_id)?;
        self.store.remove(&key, cancel).await?;
        debug!(user_id, "Invalidated user");
        Ok(())
    }

    /// Serializes `user` as JSON and caches it.
    pub async fn cache_user_json<T: Serialize + ?Sized>(
        &self,
        user_id: &str,
        user: &T,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let data = serde_json::to_string(user)?;
        self.cache_user(user_id, &data, cancel).await
    }

    /// Fetches a cached user and deserializes it from JSON.
    pub async fn get_user_json<T: DeserializeOwned>(
        &self,
        user_id: &str,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let data = self.get_user(user_id, cancel).await?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// Builds the storage key of a user.
pub fn user_key(user_id: &str) -> Result<String> {
    if user_id.is_empty() {
        return Err(CacheError::InvalidArgument(
            "User id cannot be empty".to_string(),
        ));
    }
    Ok(format!("{USER_KEY_PREFIX}{user_id}"))
}
