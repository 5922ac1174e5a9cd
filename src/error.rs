//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine and the storage backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key absent or expired
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Backing store unreachable; callers retry with their own backoff
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Cache is full and eviction is disabled
    #[error("Capacity exceeded: cache holds {0} entries and eviction is disabled")]
    CapacityExceeded(usize),

    /// Empty key, oversized key or value, negative TTL
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The caller abandoned the call before the lock was acquired
    #[error("Operation cancelled")]
    Cancelled,

    /// Stored payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            CacheError::StoreUnavailable(_) | CacheError::Cancelled => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            CacheError::CapacityExceeded(_) => StatusCode::INSUFFICIENT_STORAGE,
            CacheError::Serialization(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (CacheError::NotFound("k".into()), StatusCode::NOT_FOUND),
            (CacheError::InvalidArgument("x".into()), StatusCode::BAD_REQUEST),
            (CacheError::StoreUnavailable("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (CacheError::Cancelled, StatusCode::SERVICE_UNAVAILABLE),
            (CacheError::CapacityExceeded(2), StatusCode::INSUFFICIENT_STORAGE),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_serde_json_error_converts() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert!(matches!(CacheError::from(err), CacheError::Serialization(_)));
    }
}
