//! Bounded Store Module
//!
//! Memory-capacity-limited byte store combining HashMap storage with LRU
//! tracking, per-entry expiration and pinning, and on-demand capacity trimming.

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{CacheEntry, EntryPolicy, LruTracker, MemoryCapacity};

// == Trim Report ==
/// Outcome of one trim pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrimReport {
    /// Entries dropped because their deadline passed
    pub expired: usize,
    /// Normal-priority entries evicted to get under the ceiling
    pub evicted: usize,
    /// Accounted size after the pass
    pub size_bytes: usize,
}

impl TrimReport {
    pub fn removed(&self) -> usize {
        self.expired + self.evicted
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    entries: HashMap<String, CacheEntry>,
    lru: LruTracker,
    size_bytes: usize,
}

impl StoreInner {
    fn insert(&mut self, key: String, entry: CacheEntry) {
        if entry.is_pinned() {
            self.lru.remove(&key);
        } else {
            self.lru.touch(&key);
        }
        self.size_bytes += entry.size_bytes;
        if let Some(old) = self.entries.insert(key, entry) {
            self.size_bytes -= old.size_bytes;
        }
    }

    fn take(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(key);
        self.size_bytes -= entry.size_bytes;
        Some(entry)
    }
}

// == Bounded Store ==
/// Thread-safe byte store bounded by an absolute memory ceiling.
///
/// Writes never fail for lack of space; `trim` brings the store back under
/// its ceiling by dropping expired entries and then the least recently used
/// normal-priority ones. Pinned entries only leave through `remove`.
#[derive(Debug)]
pub struct BoundedStore {
    inner: Mutex<StoreInner>,
    capacity: MemoryCapacity,
}

impl BoundedStore {
    // == Constructor ==
    /// Creates an empty store with the given ceiling.
    pub fn new(capacity: MemoryCapacity) -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
            capacity,
        }
    }

    // == Set ==
    /// Inserts or overwrites `key`, resetting its policy and access time.
    pub fn set(&self, key: impl Into<String>, value: Bytes, policy: EntryPolicy) {
        let key = key.into();
        let entry = CacheEntry::new(&key, value, policy);
        self.inner.lock().insert(key, entry);
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Expired entries are removed and reported as absent. A hit refreshes
    /// the LRU position and any sliding deadline.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let now = current_timestamp_ms();
        let mut inner = self.inner.lock();

        let entry = inner.entries.get_mut(key)?;
        if entry.is_expired_at(now) {
            inner.take(key);
            return None;
        }

        entry.touch(now);
        let value = entry.value.clone();
        let pinned = entry.is_pinned();
        if !pinned {
            inner.lru.touch(key);
        }
        Some(value)
    }

    // == Remove ==
    /// Removes an entry by key, returning its value if it was live.
    pub fn remove(&self, key: &str) -> Option<Bytes> {
        let entry = self.inner.lock().take(key)?;
        if entry.is_expired() {
            return None;
        }
        Some(entry.value)
    }

    // == Contains ==
    /// Returns true if a live entry exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        let now = current_timestamp_ms();
        let mut inner = self.inner.lock();

        let expired = match inner.entries.get(key) {
            Some(entry) => entry.is_expired_at(now),
            None => return false,
        };
        if expired {
            inner.take(key);
        }
        !expired
    }

    /// Number of stored entries, including expired ones not yet trimmed.
    pub fn count(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Snapshot of all live keys.
    pub fn keys(&self) -> Vec<String> {
        let now = current_timestamp_ms();
        self.inner
            .lock()
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Accounted size of all entries in bytes.
    pub fn size_bytes(&self) -> usize {
        self.inner.lock().size_bytes
    }

    pub fn capacity(&self) -> MemoryCapacity {
        self.capacity
    }

    // == Trim ==
    /// Drops expired entries, then evicts least recently used normal-priority
    /// entries while the store is above its ceiling.
    pub fn trim(&self) -> TrimReport {
        let now = current_timestamp_ms();
        let limit = self.capacity.limit_bytes() as usize;
        let mut inner = self.inner.lock();

        let expired_keys: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();
        let expired = expired_keys.len();
        for key in expired_keys {
            inner.take(&key);
        }

        let mut evicted = 0;
        while inner.size_bytes > limit {
            let Some(key) = inner.lru.evict_oldest() else {
                break;
            };
            if let Some(entry) = inner.entries.remove(&key) {
                inner.size_bytes -= entry.size_bytes;
                evicted += 1;
            }
        }

        TrimReport {
            expired,
            evicted,
            size_bytes: inner.size_bytes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}
