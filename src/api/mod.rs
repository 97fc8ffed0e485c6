//! API Module
//!
//! Thin HTTP admin surface over the cache engine.
//!
//! # Endpoints
//! - `PUT /entries/:key`, `GET /entries/:key`, `DELETE /entries/:key`
//! - `PUT /interned/:key`
//! - `POST /clear`, `GET /keys`, `GET /stats`, `GET /health`

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
