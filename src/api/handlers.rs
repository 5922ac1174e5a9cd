//! API Handlers
//!
//! HTTP request handlers for each cache endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::engine::CacheEngine;
use crate::error::Result;
use crate::models::{
    DeleteResponse, ErrorResponse, ExistsResponse, GetResponse, HealthResponse, SetRequest,
    SetResponse, StatsResponse,
};
use crate::storage::Storage;
use crate::user::{user_key, UserCache, UserCacheConfig};

/// Application state shared across all handlers.
///
/// In-flight storage calls are abandoned once `shutdown` is cancelled.
#[derive(Clone)]
pub struct AppState {
    /// Backing store, in-process engine or remote
    pub store: Arc<dyn Storage>,
    /// User cache over the same store
    pub users: UserCache,
    /// Server-wide cancellation
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(store: Arc<dyn Storage>, users: UserCache, shutdown: CancellationToken) -> Self {
        Self {
            store,
            users,
            shutdown,
        }
    }

    /// Serves `store` with user settings from `config`.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn Storage>,
        shutdown: CancellationToken,
    ) -> Self {
        let users = UserCache::with_config(store.clone(), UserCacheConfig::from(config));
        Self::new(store, users, shutdown)
    }

    /// Serves an in-process engine with default user settings.
    pub fn with_engine(engine: CacheEngine) -> Self {
        let store: Arc<dyn Storage> = Arc::new(engine);
        let users = UserCache::new(store.clone());
        Self::new(store, users, CancellationToken::new())
    }
}

/// Handler for PUT /set
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    let ttl = req.ttl()?;

    state
        .store
        .put(&req.key, req.value.into_bytes(), ttl, &state.shutdown)
        .await?;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let value = state.store.fetch(&key, &state.shutdown).await?;

    Ok(Json(GetResponse::new(key, &value)))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    state.store.remove(&key, &state.shutdown).await?;

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /exists/:key
pub async fn exists_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ExistsResponse>> {
    let exists = state.store.contains(&key, &state.shutdown).await?;

    Ok(Json(ExistsResponse::new(key, exists)))
}

/// Handler for GET /stats
///
/// Remote backends keep no counters here and answer 501.
pub async fn stats_handler(State(state): State<AppState>) -> Response {
    match state.store.stats().await {
        Some(stats) => Json(StatsResponse::from(stats)).into_response(),
        None => (
            StatusCode::NOT_IMPLEMENTED,
            Json(ErrorResponse::new(format!(
                "Statistics are not available for the {} backend",
                state.store.backend()
            ))),
        )
            .into_response(),
    }
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    state.store.health_check(&state.shutdown).await?;

    Ok(Json(HealthResponse::healthy(state.store.backend())))
}

/// Handler for PUT /users/:id
///
/// Parses the JSON body and stores it re-serialized (compact, keys in
/// `serde_json` map order) for the user cache TTL.
pub async fn put_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(user): Json<Value>,
) -> Result<Json<SetResponse>> {
    state
        .users
        .cache_user_json(&user_id, &user, &state.shutdown)
        .await?;

    Ok(Json(SetResponse::new(user_key(&user_id)?)))
}

/// Handler for GET /users/:id
pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>> {
    let user: Value = state.users.get_user_json(&user_id, &state.shutdown).await?;

    Ok(Json(user))
}

/// Handler for DELETE /users/:id
pub async fn delete_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    state.users.invalidate_user(&user_id, &state.shutdown).await?;

    Ok(Json(DeleteResponse::new(user_key(&user_id)?)))
}
