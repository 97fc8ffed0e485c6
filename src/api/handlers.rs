//! API Handlers
//!
//! HTTP request handlers for each admin endpoint. Every handler is a thin
//! wrapper over one [`CacheEngine`] operation.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};

use crate::cache::{CacheEngine, CacheMetrics, MAX_VALUE_SIZE};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    validate_key_length, ClearResponse, EntryQuery, HealthResponse, InternResponse, KeysQuery,
    KeysResponse, SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared storage engine
    pub engine: Arc<CacheEngine>,
    /// Telemetry the engine and sampler publish into
    pub metrics: Arc<CacheMetrics>,
}

impl AppState {
    /// Creates a new AppState around an existing engine and its metrics.
    pub fn new(engine: Arc<CacheEngine>, metrics: Arc<CacheMetrics>) -> Self {
        Self { engine, metrics }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Sizes the store from the configured share of physical memory.
    pub fn from_config(config: &Config) -> Result<Self> {
        let metrics = Arc::new(CacheMetrics::new());
        let engine = CacheEngine::from_config(config, metrics.clone())?;
        Ok(Self::new(Arc::new(engine), metrics))
    }
}

/// Request body limit matching the largest accepted value.
pub fn body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(MAX_VALUE_SIZE)
}

fn octet_stream(value: Bytes) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/octet-stream")], value)
}

/// Handler for PUT /entries/:key
///
/// Stores the raw request body directly under `key`.
pub async fn put_entry_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<EntryQuery>,
    body: Bytes,
) -> Result<Json<SetResponse>> {
    validate_key_length(&key)?;
    let policy = query.policy()?;

    state.engine.add(&key, body, policy)?;

    Ok(Json(SetResponse::new(key)))
}

/// Handler for PUT /interned/:key
///
/// Binds `key` to a shared copy of the raw request body.
pub async fn put_interned_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Bytes,
) -> Result<Json<InternResponse>> {
    validate_key_length(&key)?;

    let outcome = state.engine.add_interned(&key, body)?;

    Ok(Json(InternResponse::new(key, outcome)))
}

/// Handler for GET /entries/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse> {
    let value = state
        .engine
        .get(&key)
        .ok_or_else(|| CacheError::NotFound(key))?;

    Ok(octet_stream(value))
}

/// Handler for DELETE /entries/:key
///
/// Returns the removed bytes. For an interned key still shared by others,
/// these are the bytes that stay cached for them.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse> {
    let value = state
        .engine
        .remove(&key)
        .ok_or_else(|| CacheError::NotFound(key))?;

    Ok(octet_stream(value))
}

/// Handler for POST /clear
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.engine.clear();
    Json(ClearResponse::new())
}

/// Handler for GET /keys?pattern=
///
/// Full scan of the store; runs on the blocking pool.
pub async fn keys_handler(
    State(state): State<AppState>,
    Query(query): Query<KeysQuery>,
) -> Result<Json<KeysResponse>> {
    let pattern = query.pattern.unwrap_or_default();
    let engine = state.engine.clone();
    let scan_pattern = pattern.clone();

    let keys = tokio::task::spawn_blocking(move || engine.keys(&scan_pattern))
        .await
        .map_err(|e| CacheError::Internal(e.to_string()))??;

    Ok(Json(KeysResponse::new(pattern, keys)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        count: state.engine.count(),
        store_entries: state.engine.store_count(),
        store_bytes: state.engine.memory_usage_bytes(),
        memory_limit_mb: state.engine.memory_limit_mb(),
        metrics: state.metrics.snapshot(),
    })
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
