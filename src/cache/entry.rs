//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: Vec<u8>,
    /// Expiration instant, None = no expiration
    pub expires_at: Option<Instant>,
    /// Last time the entry was written or read
    pub last_accessed: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry stamped at `now`.
    ///
    /// A `ttl` of `None` or zero means the entry never expires, and so does
    /// a `ttl` too large to be represented as an instant.
    pub fn new(value: Vec<u8>, ttl: Option<Duration>, now: Instant) -> Self {
        let expires_at = ttl
            .filter(|ttl| !ttl.is_zero())
            .and_then(|ttl| now.checked_add(ttl));

        Self {
            value,
            expires_at,
            last_accessed: now,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired as of `now`.
    ///
    /// An entry is expired once `now` reaches its expiration instant.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    /// Records a read at `now`.
    pub fn touch(&mut self, now: Instant) {
        self.last_accessed = now;
    }
}
