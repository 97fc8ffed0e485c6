//! Content Hash Module
//!
//! Deterministic addresses for interned payloads.

use std::fmt;

use sha2::{Digest, Sha256};

/// Prefix of every store key that holds interned content.
///
/// Keys starting with it are reserved and cannot be written directly.
pub const INTERN_KEY_PREFIX: &str = "interned:";

// == Content Hash ==
/// Address of one physical interned payload; doubles as its store key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wraps a hex digest as a content address.
    pub fn from_digest(hex: &str) -> Self {
        Self(format!("{}{}", INTERN_KEY_PREFIX, hex))
    }

    /// The key under which the payload lives in the bounded store.
    pub fn store_key(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns true if `key` lies in the interned-content namespace.
pub fn is_reserved_key(key: &str) -> bool {
    key.starts_with(INTERN_KEY_PREFIX)
}

// == Content Hasher ==
/// Maps payload bytes to a content address.
///
/// Implementations must be deterministic. Collisions merge distinct payloads,
/// so the digest width bounds how large the cache can safely grow.
pub trait ContentHasher: Send + Sync {
    fn hash(&self, value: &[u8]) -> ContentHash;
}

/// SHA-256 content hasher.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn hash(&self, value: &[u8]) -> ContentHash {
        let mut hasher = Sha256::new();
        hasher.update(value);
        ContentHash::from_digest(&format!("{:x}", hasher.finalize()))
    }
}
