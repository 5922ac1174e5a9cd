//! Cache Store Module
//!
//! Unlocked cache core combining HashMap storage with LRU tracking and TTL expiration.
//! [`crate::engine::CacheEngine`] wraps it in a lock for concurrent use.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, LruTracker, MAX_KEY_LENGTH, MAX_VALUE_SIZE};
use crate::clock::Clock;
use crate::error::{CacheError, Result};

// == Cache Store ==
/// Cache storage with LRU eviction and TTL support.
///
/// Every key in `entries` is tracked by `lru` and vice versa.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// LRU access tracker
    lru: LruTracker,
    /// Keys with a TTL, ordered by expiration instant
    expiry: BTreeSet<(Instant, String)>,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    capacity: usize,
    /// When false, a full cache rejects new keys instead of evicting
    eviction_enabled: bool,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore holding at most `capacity` entries.
    pub fn new(capacity: usize, clock: Arc<dyn Clock>) -> Result<Self> {
        if capacity == 0 {
            return Err(CacheError::InvalidArgument(
                "Capacity must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            entries: HashMap::with_capacity(capacity),
            lru: LruTracker::with_capacity(capacity),
            expiry: BTreeSet::new(),
            stats: CacheStats::new(),
            capacity,
            eviction_enabled: true,
            clock,
        })
    }

    /// Enables or disables LRU eviction when the cache is full.
    pub fn with_eviction(mut self, enabled: bool) -> Self {
        self.eviction_enabled = enabled;
        self
    }

    // == Set ==
    /// Stores a key-value pair with optional TTL.
    ///
    /// If the key already exists, the value, TTL and recency are all reset.
    /// If a new key would exceed capacity, the least recently used entry is
    /// evicted first. A `ttl` of `None` or zero never expires.
    pub fn set(&mut self, key: String, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        validate_key(&key)?;

        if value.len() > MAX_VALUE_SIZE {
            return Err(CacheError::InvalidArgument(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }

        let now = self.clock.now();

        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.make_room(now)?;
        }

        let entry = CacheEntry::new(value, ttl, now);
        if let Some(old) = self.entries.get(&key) {
            if let Some(expires) = old.expires_at {
                self.expiry.remove(&(expires, key.clone()));
            }
        }
        if let Some(expires) = entry.expires_at {
            self.expiry.insert((expires, key.clone()));
        }

        self.lru.touch(&key);
        self.entries.insert(key, entry);
        self.stats.set_total_entries(self.entries.len());

        Ok(())
    }

    // == Get ==
    /// Retrieves a value by key and marks it most recently used.
    ///
    /// Expired entries are removed and reported as `NotFound`.
    pub fn get(&mut self, key: &str) -> Result<Vec<u8>> {
        validate_key(key)?;
        let now = self.clock.now();

        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                self.stats.record_miss();
                return Err(CacheError::NotFound(key.to_string()));
            }
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            return Err(CacheError::NotFound(key.to_string()));
        }

        let value = match self.entries.get_mut(key) {
            Some(entry) => {
                entry.touch(now);
                entry.value.clone()
            }
            None => return Err(CacheError::NotFound(key.to_string())),
        };

        self.lru.touch(key);
        self.stats.record_hit();
        Ok(value)
    }

    // == Delete ==
    /// Removes an entry by key.
    ///
    /// Deleting an absent key is not an error. Returns true if a live
    /// entry was removed.
    pub fn delete(&mut self, key: &str) -> Result<bool> {
        validate_key(key)?;
        let now = self.clock.now();

        match self.remove_entry(key) {
            Some(entry) if entry.is_expired(now) => {
                self.stats.record_expirations(1);
                Ok(false)
            }
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }

    // == Exists ==
    /// Returns true if the key holds an unexpired entry.
    ///
    /// Does not touch recency and never removes anything.
    pub fn exists(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        let now = self.clock.now();

        Ok(self
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now)))
    }

    // == Sweep Expired ==
    /// Removes at most `max` expired entries, soonest-expiring first.
    ///
    /// Walks the expiry index, so the cost follows the number removed rather
    /// than the number stored. Returns the number of entries removed.
    pub fn sweep_expired(&mut self, max: usize) -> usize {
        let now = self.clock.now();
        self.reclaim_expired(max, now)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    /// Returns the current number of entries, expired ones included until reclaimed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn make_room(&mut self, now: Instant) -> Result<()> {
        if !self.eviction_enabled {
            // Expired entries are logically absent and may always be reclaimed.
            if self.reclaim_expired(1, now) == 0 {
                return Err(CacheError::CapacityExceeded(self.capacity));
            }
            return Ok(());
        }

        let key = self
            .lru
            .evict_oldest()
            .ok_or(CacheError::CapacityExceeded(self.capacity))?;

        if let Some(entry) = self.entries.remove(&key) {
            if let Some(expires) = entry.expires_at {
                self.expiry.remove(&(expires, key.clone()));
            }
            if entry.is_expired(now) {
                self.stats.record_expirations(1);
            } else {
                self.stats.record_eviction();
                debug!(key = %key, "Evicted least recently used entry");
            }
        }

        Ok(())
    }

    fn reclaim_expired(&mut self, max: usize, now: Instant) -> usize {
        let expired_keys: Vec<String> = self
            .expiry
            .iter()
            .take_while(|(expires, _)| *expires <= now)
            .take(max)
            .map(|(_, key)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
        }

        self.stats.record_expirations(expired_keys.len());
        expired_keys.len()
    }

    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(key);
        if let Some(expires) = entry.expires_at {
            self.expiry.remove(&(expires, key.to_string()));
        }
        self.stats.set_total_entries(self.entries.len());
        Some(entry)
    }

    /// Asserts the entry map and the LRU ranking hold exactly the same keys.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        assert_eq!(self.entries.len(), self.lru.len());
        for key in self.lru.iter() {
            assert!(self.entries.contains_key(key), "untracked key {key}");
        }
        assert!(self.entries.len() <= self.capacity);

        let with_ttl = self
            .entries
            .values()
            .filter(|entry| entry.expires_at.is_some())
            .count();
        assert_eq!(self.expiry.len(), with_ttl);
        for (expires, key) in &self.expiry {
            let entry = self.entries.get(key).expect("indexed key has an entry");
            assert_eq!(entry.expires_at, Some(*expires));
        }
    }

    #[cfg(test)]
    pub(crate) fn lru_order(&self) -> Vec<String> {
        self.lru.iter().map(str::to_string).collect()
    }
}

/// Rejects empty keys and keys longer than [`MAX_KEY_LENGTH`].
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidArgument(
            "Key cannot be empty".to_string(),
        ));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidArgument(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}
