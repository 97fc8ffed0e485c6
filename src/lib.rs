//! Cache Node - A memory-bounded cache engine with content interning
//!
//! Byte values keyed by string, trimmed to a share of physical memory, with
//! reference-counted deduplication of identical payloads.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::CacheEngine;
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::{spawn_sampler_task, spawn_trim_task, MetricsSampler};
