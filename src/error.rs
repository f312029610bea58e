//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// TTL of zero seconds (entries must outlive their creation instant)
    #[error("Invalid TTL: {0}")]
    InvalidTtl(String),

    /// Key is empty or too long
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Value or argument could not be encoded/decoded as JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == Remote Error Enum ==
/// Failure of a single remote-tier call.
///
/// These never leave the coordinator: each one is logged and treated as
/// "the remote returned nothing" for that call.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Remote tier failed its health probe or could not connect
    #[error("Remote unavailable: {0}")]
    Unavailable(String),

    /// Call exceeded the configured per-call timeout
    #[error("Remote call timed out after {0}ms")]
    Timeout(u64),

    /// The remote rejected or failed the operation
    #[error("Remote operation failed: {0}")]
    Operation(String),

    /// Stored bytes were not valid JSON
    #[error("Remote payload could not be decoded: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for RemoteError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error() {
            RemoteError::Unavailable(err.to_string())
        } else {
            RemoteError::Operation(err.to_string())
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidTtl(_)
            | CacheError::InvalidKey(_)
            | CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::Serialization(_) | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Result of a single remote-tier call.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;
