//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror. None of these errors reach
//! callers of the cache manager; storage failures are absorbed by the
//! persistent tier and only the diagnostics API turns errors into responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Storage Error Enum ==
/// Failure reported by a storage backend.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backend has no room for the write
    #[error("Storage quota exceeded")]
    QuotaExceeded,

    /// The backend could not be opened or is not usable
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Underlying I/O failure
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// == API Error Enum ==
/// Error type for the diagnostics API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

// == Result Type Aliases ==
/// Result type returned by storage backends.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Result type returned by diagnostics handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
