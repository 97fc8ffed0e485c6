//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing JSON response bodies. Cached values are
//! returned as raw bytes and have no DTO.

use serde::Serialize;

use crate::cache::{InternOutcome, MetricsSnapshot};

/// Response body for `PUT /entries/:key`
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for `PUT /interned/:key`
#[derive(Debug, Clone, Serialize)]
pub struct InternResponse {
    pub key: String,
    /// "created", "shared" or "unchanged"
    pub outcome: &'static str,
}

impl InternResponse {
    pub fn new(key: impl Into<String>, outcome: InternOutcome) -> Self {
        let outcome = match outcome {
            InternOutcome::Created => "created",
            InternOutcome::Shared => "shared",
            InternOutcome::Unchanged => "unchanged",
        };
        Self {
            key: key.into(),
            outcome,
        }
    }
}

/// Response body for `POST /clear`
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
}

impl ClearResponse {
    pub fn new() -> Self {
        Self {
            message: "Cache cleared".to_string(),
        }
    }
}

impl Default for ClearResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Response body for `GET /keys`
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub pattern: String,
    pub count: usize,
    pub keys: Vec<String>,
}

impl KeysResponse {
    pub fn new(pattern: impl Into<String>, keys: Vec<String>) -> Self {
        Self {
            pattern: pattern.into(),
            count: keys.len(),
            keys,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Logical keys: intern bindings plus direct entries
    pub count: usize,
    /// Physical entries in the active store
    pub store_entries: usize,
    /// Accounted store size in bytes
    pub store_bytes: usize,
    pub memory_limit_mb: u64,
    /// Latest published telemetry
    pub metrics: MetricsSnapshot,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
