//! KV Cache - An embedded key-value cache engine
//!
//! Provides TTL expiration, bounded capacity with LRU eviction and a
//! background sweeper, behind a narrow storage interface with a user
//! caching layer on top.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod storage;
pub mod tasks;
pub mod user;

pub use api::AppState;
pub use config::Config;
pub use engine::CacheEngine;
pub use error::{CacheError, Result};
pub use storage::Storage;
pub use tasks::spawn_sweeper;
pub use user::{UserCache, UserCacheConfig};
