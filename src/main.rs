//! KV Cache - An embedded key-value cache engine served over HTTP
//!
//! Startup loads configuration, picks the storage backend, checks it with a
//! user cache round trip and serves the REST API until SIGINT/SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kv_cache::api::create_router;
use kv_cache::tasks::{spawn_sweeper, SweeperConfig};
use kv_cache::{AppState, CacheEngine, Config, Storage, UserCache};

/// Main entry point for the cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Connect the remote store, or build the in-process engine and its sweeper
/// 4. Health check and user cache round trip against the store
/// 5. Start HTTP server on configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kv_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting KV Cache server");

    let config = Config::from_env();
    info!(
        max_entries = config.max_entries,
        eviction_enabled = config.eviction_enabled,
        sweep_interval_secs = config.sweep_interval.as_secs(),
        user_ttl_secs = config.user_ttl.as_secs(),
        port = config.server_port,
        "Configuration loaded"
    );

    let shutdown = CancellationToken::new();
    let (store, sweeper) = build_store(&config, &shutdown).await?;
    let state = AppState::from_config(&config, store, shutdown.clone());

    if let Err(e) = self_check(&state.store, &state.users, &shutdown).await {
        error!(error = %e, backend = state.store.backend(), "Store self-check failed");
        shutdown.cancel();
        return Err(e);
    }

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("server error")?;

    if let Some(handle) = sweeper {
        if let Err(e) = handle.await {
            warn!(error = %e, "Sweeper task ended abnormally");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Builds the configured backend. The in-process engine also gets a sweeper.
async fn build_store(
    config: &Config,
    shutdown: &CancellationToken,
) -> anyhow::Result<(Arc<dyn Storage>, Option<JoinHandle<()>>)> {
    if let Some(url) = &config.store_url {
        return connect_remote(url).await.map(|store| (store, None));
    }

    let engine = CacheEngine::from_config(config).context("invalid cache configuration")?;
    let sweeper = spawn_sweeper(
        engine.clone(),
        SweeperConfig::from(config),
        shutdown.clone(),
    );
    info!(capacity = config.max_entries, "In-process cache engine initialized");

    Ok((Arc::new(engine), Some(sweeper)))
}

#[cfg(feature = "redis-store")]
async fn connect_remote(url: &str) -> anyhow::Result<Arc<dyn Storage>> {
    let store = kv_cache::storage::RedisStorage::connect(url)
        .await
        .context("failed to connect to remote store")?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "redis-store"))]
async fn connect_remote(_url: &str) -> anyhow::Result<Arc<dyn Storage>> {
    anyhow::bail!("STORE_URL is set but this build lacks the `redis-store` feature")
}

/// Pings the store, then caches, reads back and invalidates a probe user.
async fn self_check(
    store: &Arc<dyn Storage>,
    users: &UserCache,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    const PROBE_ID: &str = "__startup_probe__";

    store.health_check(cancel).await.context("health check")?;

    users
        .cache_user(PROBE_ID, r#"{"name": "probe"}"#, cancel)
        .await
        .context("cache probe user")?;
    let data = users
        .get_user(PROBE_ID, cancel)
        .await
        .context("read probe user")?;
    let exists = store
        .contains(&kv_cache::user::user_key(PROBE_ID)?, cancel)
        .await
        .context("probe existence")?;
    users
        .invalidate_user(PROBE_ID, cancel)
        .await
        .context("invalidate probe user")?;

    info!(
        backend = store.backend(),
        probe_bytes = data.len(),
        exists,
        "Store self-check passed"
    );
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then cancels `shutdown`
/// so the sweeper and in-flight storage calls stop.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    shutdown.cancel();
    warn!("Shutdown signalled, sweeper stopping");
}
