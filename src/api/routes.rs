//! API Routes
//!
//! Configures the Axum router with all admin endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    body_limit, clear_handler, delete_handler, get_handler, health_handler, keys_handler,
    put_entry_handler, put_interned_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /entries/:key` - Store raw bytes directly (`?ttl=`, `?sliding=`, `?pinned=`)
/// - `GET /entries/:key` - Retrieve raw bytes
/// - `DELETE /entries/:key` - Remove a key, returning its bytes
/// - `PUT /interned/:key` - Store raw bytes as shared, deduplicated content
/// - `POST /clear` - Drop everything
/// - `GET /keys` - List keys matching `?pattern=`
/// - `GET /stats` - Counts and telemetry
/// - `GET /health` - Health check endpoint
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/entries/:key",
            put(put_entry_handler)
                .get(get_handler)
                .delete(delete_handler),
        )
        .route("/interned/:key", put(put_interned_handler))
        .route("/clear", post(clear_handler))
        .route("/keys", get(keys_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(body_limit())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
