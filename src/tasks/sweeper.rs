//! Expiration Sweeper
//!
//! Background task that periodically removes expired cache entries,
//! independent of client traffic.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::engine::CacheEngine;

/// Longest accepted pause between passes; larger intervals are clamped.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Sweeper timing and batching.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Time between passes
    pub interval: Duration,
    /// Maximum entries removed per lock acquisition
    pub batch_size: usize,
    /// Maximum batches per pass
    pub max_batches: usize,
    /// Longest wait for the cache lock before the pass is skipped
    pub lock_timeout: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SweeperConfig {
    fn from(config: &Config) -> Self {
        Self {
            interval: config.sweep_interval,
            batch_size: config.sweep_batch_size,
            max_batches: config.sweep_max_batches,
            lock_timeout: config.sweep_lock_timeout,
        }
    }
}

/// Reclaims expired entries in bounded batches so foreground calls
/// interleave between them.
pub struct Sweeper {
    engine: CacheEngine,
    config: SweeperConfig,
    shutdown: CancellationToken,
}

impl Sweeper {
    pub fn new(engine: CacheEngine, config: SweeperConfig) -> Self {
        Self {
            engine,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Runs a single pass and returns the number of entries removed.
    ///
    /// Lock contention ends the pass early; the rest waits for the next tick.
    pub async fn run_once(&self) -> usize {
        let batch_size = self.config.batch_size.max(1);
        let mut removed = 0;

        for _ in 0..self.config.max_batches.max(1) {
            match self
                .engine
                .sweep_expired(batch_size, self.config.lock_timeout)
                .await
            {
                Ok(count) => {
                    removed += count;
                    if count < batch_size {
                        return removed;
                    }
                }
                Err(e) => {
                    warn!(error = %e, removed, "Sweep pass interrupted, retrying next tick");
                    return removed;
                }
            }

            // release the lock to waiting callers between batches
            tokio::task::yield_now().await;
        }

        debug!(
            removed,
            "Sweep pass reached its batch limit, remaining entries wait for the next tick"
        );
        removed
    }

    /// Spawns the periodic loop. It stops when the cancellation token fires;
    /// the returned handle can also be aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = self
                .config
                .interval
                .clamp(Duration::from_millis(1), MAX_SWEEP_INTERVAL);
            if period < self.config.interval {
                warn!(
                    requested_secs = self.config.interval.as_secs(),
                    "Sweep interval clamped to one year"
                );
            }
            info!(
                interval_ms = period.as_millis() as u64,
                batch_size = self.config.batch_size,
                "Starting expiration sweeper"
            );

            let now = Instant::now();
            let start = now.checked_add(period).unwrap_or(now);
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("Sweeper: shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = self.run_once().await;
                        if removed > 0 {
                            info!(removed, "Sweeper removed expired entries");
                        } else {
                            debug!("Sweeper found no expired entries");
                        }
                    }
                }
            }
        })
    }
}

/// Spawns a [`Sweeper`] over `engine` that runs until `shutdown` is cancelled.
///
/// # Example
/// ```ignore
/// let shutdown = CancellationToken::new();
/// let handle = spawn_sweeper(engine.clone(), SweeperConfig::from(&config), shutdown.clone());
/// // Later, during shutdown:
/// shutdown.cancel();
/// handle.await?;
/// ```
pub fn spawn_sweeper(
    engine: CacheEngine,
    config: SweeperConfig,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    Sweeper::new(engine, config)
        .with_cancellation(shutdown)
        .spawn()
}
