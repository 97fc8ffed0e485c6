//! Request and Response models for the admin API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP query strings and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{validate_key_length, EntryQuery, KeysQuery};
pub use responses::{
    ClearResponse, HealthResponse, InternResponse, KeysResponse, SetResponse, StatsResponse,
};
