//! Background Tasks Module
//!
//! Contains background tasks that run alongside the cache engine.
//!
//! # Tasks
//! - Sweeper: Removes expired cache entries at configured intervals

mod sweeper;

pub use sweeper::{spawn_sweeper, Sweeper, SweeperConfig};
