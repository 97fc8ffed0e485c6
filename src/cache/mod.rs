//! Cache Module
//!
//! Memory-bounded byte storage with expiration, pinning and capacity trimming,
//! plus reference-counted content interning on top.

mod engine;
mod entry;
mod hash;
mod intern;
mod lru;
mod memory;
mod metrics;
mod store;


// Re-export public types
pub use engine::CacheEngine;
pub use entry::{current_timestamp_ms, CacheEntry, EntryPolicy, Expiration, Priority};
pub use hash::{is_reserved_key, ContentHash, ContentHasher, Sha256Hasher, INTERN_KEY_PREFIX};
pub use intern::{InternGuard, InternOutcome, InternTable, Release};
pub use lru::LruTracker;
pub use memory::{
    system_total_memory_bytes, FixedProbe, MemoryCapacity, MemoryProbe, SysinfoProbe,
    BYTES_PER_MB,
};
pub use metrics::{CacheMetrics, MetricsSink, MetricsSnapshot};
pub use store::{BoundedStore, TrimReport};

// == Public Constants ==
/// Maximum allowed key length in bytes, enforced at the HTTP boundary
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes, enforced at the HTTP boundary
pub const MAX_VALUE_SIZE: usize = 16 * 1024 * 1024; // 16 MB
