//! Request DTOs for the admin API
//!
//! Query-string parameters of incoming HTTP requests. Values travel as raw
//! request bodies.

use std::time::Duration;

use serde::Deserialize;

use crate::cache::{EntryPolicy, Priority, MAX_KEY_LENGTH};
use crate::error::{CacheError, Result};

/// Query parameters for `PUT /entries/:key`
///
/// # Fields
/// - `ttl`: Absolute expiration in seconds from now
/// - `sliding`: Sliding expiration window in seconds
/// - `pinned`: Exempt the entry from capacity trimming
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryQuery {
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default)]
    pub sliding: Option<u64>,
    #[serde(default)]
    pub pinned: bool,
}

impl EntryQuery {
    /// Builds the entry policy these parameters describe.
    pub fn policy(&self) -> Result<EntryPolicy> {
        let policy = match (self.ttl, self.sliding) {
            (Some(_), Some(_)) => {
                return Err(CacheError::InvalidArgument(
                    "ttl and sliding are mutually exclusive".to_string(),
                ))
            }
            (Some(ttl), None) => EntryPolicy::ttl(Duration::from_secs(ttl)),
            (None, Some(window)) => EntryPolicy::sliding(Duration::from_secs(window)),
            (None, None) => EntryPolicy::no_expiry(),
        };

        if self.pinned {
            Ok(policy.with_priority(Priority::Pinned))
        } else {
            Ok(policy)
        }
    }
}

/// Query parameters for `GET /keys`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeysQuery {
    #[serde(default)]
    pub pattern: Option<String>,
}

/// Checks key length before it reaches the engine.
pub fn validate_key_length(key: &str) -> Result<()> {
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidArgument(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}
