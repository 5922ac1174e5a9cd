//! Request DTOs for the cache API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{CacheError, Result};

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: The value to store
/// - `ttl_ms`: Optional TTL in milliseconds; absent or zero never expires
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: String,
    /// Optional TTL in milliseconds
    #[serde(default)]
    pub ttl_ms: Option<i64>,
}

impl SetRequest {
    /// Validates the request and returns the TTL to apply.
    pub fn ttl(&self) -> Result<Option<Duration>> {
        if self.key.is_empty() {
            return Err(CacheError::InvalidArgument(
                "Key cannot be empty".to_string(),
            ));
        }
        match self.ttl_ms {
            Some(ms) if ms < 0 => Err(CacheError::InvalidArgument(format!(
                "TTL cannot be negative, got {ms}ms"
            ))),
            Some(0) | None => Ok(None),
            Some(ms) => Ok(Some(Duration::from_millis(ms as u64))),
        }
    }
}
