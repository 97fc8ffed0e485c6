//! Error types for the cache node
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
/// Unified error type for the cache node.
///
/// A missing key is not an error inside the engine (lookups return `Option`);
/// `NotFound` exists for the HTTP surface only.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    /// Blank key, reserved key or unusable entry policy
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Capacity percentage or other setting out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Key filter pattern failed to compile
    #[error("Malformed pattern: {0}")]
    MalformedPattern(String),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidArgument(_)
            | CacheError::InvalidConfiguration(_)
            | CacheError::MalformedPattern(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache node.
pub type Result<T> = std::result::Result<T, CacheError>;
