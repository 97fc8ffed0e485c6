//! Cache Entry Module
//!
//! Defines individual cache entries and the expiration/priority policy they carry.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;

use crate::error::{CacheError, Result};

/// Approximate bookkeeping cost of one entry beyond its key and payload bytes.
pub const ENTRY_OVERHEAD_BYTES: usize = 64;

// == Expiration ==
/// When an entry stops being visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// Never expires
    Never,
    /// Expires at a fixed Unix timestamp in milliseconds
    Absolute(u64),
    /// Expires after the window elapses without an access
    Sliding(Duration),
}

// == Priority ==
/// Eviction priority under memory pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    /// Evictable by capacity trimming
    Normal,
    /// Immune to capacity trimming, removable only explicitly
    Pinned,
}

// == Entry Policy ==
/// Expiration and priority settings applied to an entry on `set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPolicy {
    pub expiration: Expiration,
    pub priority: Priority,
}

impl EntryPolicy {
    /// Normal priority, no expiration.
    pub fn no_expiry() -> Self {
        Self {
            expiration: Expiration::Never,
            priority: Priority::Normal,
        }
    }

    /// Pinned, no expiration. Used for interned content.
    pub fn pinned() -> Self {
        Self {
            expiration: Expiration::Never,
            priority: Priority::Pinned,
        }
    }

    /// Normal priority, expires `ttl` from now.
    pub fn ttl(ttl: Duration) -> Self {
        let expires_at = current_timestamp_ms().saturating_add(duration_ms(ttl));
        Self {
            expiration: Expiration::Absolute(expires_at),
            priority: Priority::Normal,
        }
    }

    /// Normal priority, expires after `window` without access.
    pub fn sliding(window: Duration) -> Self {
        Self {
            expiration: Expiration::Sliding(window),
            priority: Priority::Normal,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Rejects policies that could never hold a value.
    pub fn validate(&self) -> Result<()> {
        match self.expiration {
            Expiration::Sliding(window) if window.is_zero() => Err(CacheError::InvalidArgument(
                "sliding expiration window must be non-zero".to_string(),
            )),
            Expiration::Absolute(at) if at <= current_timestamp_ms() => {
                Err(CacheError::InvalidArgument(
                    "absolute expiration must lie in the future".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }
}

impl Default for EntryPolicy {
    fn default() -> Self {
        Self::no_expiry()
    }
}

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored payload
    pub value: Bytes,
    /// Expiration and priority settings
    pub policy: EntryPolicy,
    /// Last successful read or write (Unix milliseconds)
    pub last_accessed: u64,
    /// Accounted size: key + payload + overhead
    pub size_bytes: usize,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry stored under `key`.
    pub fn new(key: &str, value: Bytes, policy: EntryPolicy) -> Self {
        let now = current_timestamp_ms();
        let size_bytes = key.len() + value.len() + ENTRY_OVERHEAD_BYTES;

        Self {
            value,
            policy,
            last_accessed: now,
            size_bytes,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at time `now`.
    ///
    /// An entry is expired once the current time is greater than or equal to
    /// its deadline.
    pub fn is_expired_at(&self, now: u64) -> bool {
        match self.expires_at() {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Returns the current deadline, or None if the entry never expires.
    ///
    /// Sliding deadlines move with `last_accessed`.
    pub fn expires_at(&self) -> Option<u64> {
        match self.policy.expiration {
            Expiration::Never => None,
            Expiration::Absolute(at) => Some(at),
            Expiration::Sliding(window) => {
                Some(self.last_accessed.saturating_add(duration_ms(window)))
            }
        }
    }

    /// Records an access at `now`, extending a sliding deadline.
    pub fn touch(&mut self, now: u64) {
        self.last_accessed = now;
    }

    pub fn is_pinned(&self) -> bool {
        self.policy.priority == Priority::Pinned
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(duration_ms)
        .unwrap_or(0)
}

/// Milliseconds in `d`, saturating at `u64::MAX`.
fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
