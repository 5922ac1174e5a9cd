//! Configuration Module
//!
//! Handles loading and managing engine and server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Engine, sweeper, user cache and server parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// Evict the least recently used entry when full; otherwise reject new keys
    pub eviction_enabled: bool,
    /// Interval between sweeper passes
    pub sweep_interval: Duration,
    /// Maximum expired entries removed per lock acquisition
    pub sweep_batch_size: usize,
    /// Maximum batches per sweeper pass
    pub sweep_max_batches: usize,
    /// Longest the sweeper waits for the cache lock before skipping a pass
    pub sweep_lock_timeout: Duration,
    /// TTL applied to cached users
    pub user_ttl: Duration,
    /// HTTP server port
    pub server_port: u16,
    /// Remote store URL; `None` serves from the in-process engine
    pub store_url: Option<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `EVICTION_ENABLED` - LRU eviction on overflow (default: true)
    /// - `SWEEP_INTERVAL_SECS` - Sweeper interval in seconds (default: 60)
    /// - `SWEEP_BATCH_SIZE` - Expired entries removed per batch (default: 1000)
    /// - `SWEEP_MAX_BATCHES` - Batches per sweeper pass (default: 16)
    /// - `SWEEP_LOCK_TIMEOUT_MS` - Sweeper lock wait in milliseconds (default: 50)
    /// - `USER_TTL_SECS` - TTL of cached users in seconds (default: 3600)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `STORE_URL` - Remote store URL, e.g. `redis://localhost:6379/0` (default: unset)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            eviction_enabled: env_or("EVICTION_ENABLED", defaults.eviction_enabled),
            sweep_interval: Duration::from_secs(env_or(
                "SWEEP_INTERVAL_SECS",
                defaults.sweep_interval.as_secs(),
            )),
            sweep_batch_size: env_or("SWEEP_BATCH_SIZE", defaults.sweep_batch_size),
            sweep_max_batches: env_or("SWEEP_MAX_BATCHES", defaults.sweep_max_batches),
            sweep_lock_timeout: Duration::from_millis(env_or(
                "SWEEP_LOCK_TIMEOUT_MS",
                defaults.sweep_lock_timeout.as_millis() as u64,
            )),
            user_ttl: Duration::from_secs(env_or("USER_TTL_SECS", defaults.user_ttl.as_secs())),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            store_url: env::var("STORE_URL").ok().filter(|url| !url.is_empty()),
        }
    }
}

/// Parses `name` from the environment, falling back to `default` when unset or malformed.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            eviction_enabled: true,
            sweep_interval: Duration::from_secs(60),
            sweep_batch_size: 1000,
            sweep_max_batches: 16,
            sweep_lock_timeout: Duration::from_millis(50),
            user_ttl: Duration::from_secs(3600),
            server_port: 3000,
            store_url: None,
        }
    }
}
