//! Cache Engine Module
//!
//! Public surface of the storage engine. Coordinates the active bounded
//! store with the intern table.
//!
//! # Locking
//! - The intern lock (inside [`InternTable`]) guards bindings and refcounts.
//! - A readers-writer lock guards which [`BoundedStore`] is active. Request
//!   paths take the read side; only `clear` takes the write side, to swap.
//! - The intern lock is always acquired before the store lock.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use rayon::prelude::*;
use regex::RegexBuilder;
use tracing::{debug, info};

use crate::cache::hash::is_reserved_key;
use crate::cache::{
    BoundedStore, ContentHasher, EntryPolicy, InternOutcome, InternTable, MemoryCapacity,
    MetricsSink, Sha256Hasher, TrimReport,
};
use crate::config::Config;
use crate::error::{CacheError, Result};

// == Cache Engine ==
pub struct CacheEngine {
    store: RwLock<Arc<BoundedStore>>,
    interns: InternTable,
    hasher: Arc<dyn ContentHasher>,
    metrics: Arc<dyn MetricsSink>,
    capacity: MemoryCapacity,
}

impl CacheEngine {
    // == Constructors ==
    /// Creates an engine with an empty store bounded by `capacity`.
    pub fn new(capacity: MemoryCapacity, metrics: Arc<dyn MetricsSink>) -> Self {
        Self {
            store: RwLock::new(Arc::new(BoundedStore::new(capacity))),
            interns: InternTable::new(),
            hasher: Arc::new(Sha256Hasher),
            metrics,
            capacity,
        }
    }

    /// Sizes the store from the configured share of physical memory.
    pub fn from_config(config: &Config, metrics: Arc<dyn MetricsSink>) -> Result<Self> {
        let capacity = MemoryCapacity::of_system_memory(config.memory_limit_percent)?;
        Ok(Self::new(capacity, metrics))
    }

    /// Replaces the content hasher. Only meaningful before first use.
    pub fn with_hasher(mut self, hasher: impl ContentHasher + 'static) -> Self {
        self.hasher = Arc::new(hasher);
        self
    }

    // == Add ==
    /// Stores `value` directly under `key`, bypassing interning.
    pub fn add(&self, key: &str, value: Bytes, policy: EntryPolicy) -> Result<()> {
        validate_key(key)?;
        policy.validate()?;

        self.store.read().set(key, value, policy);
        self.metrics.increment_adds();
        Ok(())
    }

    // == Add Interned ==
    /// Binds `key` to a shared, pinned copy of `value`.
    pub fn add_interned(&self, key: &str, value: Bytes) -> Result<InternOutcome> {
        validate_key(key)?;

        let hash = self.hasher.hash(&value);
        let outcome = {
            let mut interns = self.interns.lock();
            let store = self.store.read();
            interns.intern(key, hash.clone(), value, &store)
        };

        debug!("Interned '{}' as {} ({:?})", key, hash, outcome);
        self.metrics.increment_adds();
        Ok(outcome)
    }

    // == Get ==
    /// Returns the value for `key`, following its intern binding if any.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.metrics.increment_gets();

        let interns = self.interns.lock();
        let store = self.store.read();
        match interns.lookup(key) {
            Some(hash) => store.get(hash.store_key()),
            None => store.get(key),
        }
    }

    // == Remove ==
    /// Removes `key` and returns its value.
    ///
    /// For an interned key only the binding goes away. If other keys still
    /// share the content, the returned bytes stay cached for them.
    pub fn remove(&self, key: &str) -> Option<Bytes> {
        self.metrics.increment_removes();

        if is_reserved_key(key) {
            debug!("Refusing direct removal of interned content '{}'", key);
            return None;
        }

        let mut interns = self.interns.lock();
        let store = self.store.read();
        if let Some(release) = interns.release(key, &store) {
            debug!("Released interned key '{}': {:?}", key, release);
            return release.into_value();
        }
        drop(interns);

        store.remove(key)
    }

    // == Clear ==
    /// Swaps in a fresh, empty store and drops every intern binding.
    ///
    /// In-flight readers finish against the old store, which is freed when
    /// the last of them lets go.
    pub fn clear(&self) {
        let mut interns = self.interns.lock();
        let fresh = Arc::new(BoundedStore::new(self.capacity));
        let old = std::mem::replace(&mut *self.store.write(), fresh);
        interns.clear();
        drop(interns);

        info!("Cache cleared, {} entries dropped", old.count());
    }

    // == Keys ==
    /// Lists stored keys (direct and content keys) matching `pattern`.
    ///
    /// An empty pattern or `*` matches everything; anything else is a
    /// case-insensitive regular expression. Scans the whole store.
    pub fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let regex = if pattern.is_empty() || pattern == "*" {
            None
        } else {
            let compiled = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| CacheError::MalformedPattern(e.to_string()))?;
            Some(compiled)
        };

        let snapshot = self.store.read().keys();
        let mut matched: Vec<String> = match regex {
            Some(regex) => snapshot
                .into_par_iter()
                .filter(|key| regex.is_match(key))
                .collect(),
            None => snapshot,
        };
        matched.sort_unstable();
        Ok(matched)
    }

    // == Count ==
    /// Number of logical keys: bindings plus direct entries.
    pub fn count(&self) -> usize {
        let interns = self.interns.lock();
        let store = self.store.read();
        (interns.binding_count() + store.count()).saturating_sub(interns.content_count())
    }

    pub fn memory_limit_mb(&self) -> u64 {
        self.capacity.limit_mb()
    }

    pub fn capacity(&self) -> MemoryCapacity {
        self.capacity
    }

    // == Inspection ==
    pub fn is_interned(&self, key: &str) -> bool {
        self.interns.lock().lookup(key).is_some()
    }

    /// Refcount of the content `key` is bound to, 0 if not interned.
    pub fn refcount_of(&self, key: &str) -> usize {
        let interns = self.interns.lock();
        interns
            .lookup(key)
            .map(|hash| interns.refcount(&hash))
            .unwrap_or(0)
    }

    /// Physical entries in the active store.
    pub fn store_count(&self) -> usize {
        self.store.read().count()
    }

    /// Accounted size of the active store.
    pub fn memory_usage_bytes(&self) -> usize {
        self.store.read().size_bytes()
    }

    // == Trim ==
    /// Runs one trim pass over the active store.
    pub fn trim(&self) -> TrimReport {
        let store = self.store.read().clone();
        store.trim()
    }

    #[cfg(test)]
    pub(crate) fn interns_for_test(&self) -> (&InternTable, Arc<BoundedStore>) {
        (&self.interns, self.store.read().clone())
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(CacheError::InvalidArgument(
            "Key cannot be blank".to_string(),
        ));
    }
    if is_reserved_key(key) {
        return Err(CacheError::InvalidArgument(format!(
            "Key '{}' is in the reserved interned namespace",
            key
        )));
    }
    Ok(())
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheMetrics, ContentHash, Priority};
    use std::thread::sleep;
    use std::time::Duration;

    fn engine() -> (CacheEngine, Arc<CacheMetrics>) {
        let metrics = Arc::new(CacheMetrics::new());
        let engine = CacheEngine::new(MemoryCapacity::from_bytes(1024 * 1024), metrics.clone());
        (engine, metrics)
    }

    fn b(data: &[u8]) -> Bytes {
        Bytes::copy_from_slice(data)
    }

    #[test]
    fn test_add_and_get_roundtrip() {
        let (engine, _) = engine();

        engine.add("user:1", b(&[1, 2, 3]), EntryPolicy::no_expiry()).unwrap();

        assert_eq!(engine.count(), 1);
        assert_eq!(engine.get("user:1"), Some(b(&[1, 2, 3])));
        assert!(!engine.is_interned("user:1"));
    }

    #[test]
    fn test_add_rejects_invalid_arguments() {
        let (engine, metrics) = engine();

        for key in ["", "   ", "\t"] {
            assert!(matches!(
                engine.add(key, b(b"v"), EntryPolicy::no_expiry()),
                Err(CacheError::InvalidArgument(_))
            ));
            assert!(matches!(
                engine.add_interned(key, b(b"v")),
                Err(CacheError::InvalidArgument(_))
            ));
        }
        assert!(matches!(
            engine.add("k", b(b"v"), EntryPolicy::sliding(Duration::ZERO)),
            Err(CacheError::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.add("interned:abc", b(b"v"), EntryPolicy::no_expiry()),
            Err(CacheError::InvalidArgument(_))
        ));

        assert_eq!(engine.count(), 0);
        assert_eq!(engine.store_count(), 0);
        assert_eq!(metrics.snapshot().adds, 0);
    }

    #[test]
    fn test_interned_dedup_and_release() {
        let (engine, _) = engine();

        engine.add_interned("doc:a", b(&[9, 9])).unwrap();
        engine.add_interned("doc:b", b(&[9, 9])).unwrap();

        assert_eq!(engine.store_count(), 1);
        assert_eq!(engine.refcount_of("doc:a"), 2);

        assert_eq!(engine.remove("doc:a"), Some(b(&[9, 9])));
        assert_eq!(engine.refcount_of("doc:b"), 1);
        assert_eq!(engine.store_count(), 1);
        assert_eq!(engine.get("doc:b"), Some(b(&[9, 9])));
        assert_eq!(engine.get("doc:a"), None);
    }

    #[test]
    fn test_reintern_with_new_content() {
        let (engine, _) = engine();

        engine.add_interned("k", b(b"v1")).unwrap();
        engine.add_interned("k", b(b"v2")).unwrap();

        let old = Sha256Hasher.hash(b"v1");
        assert_eq!(engine.get("k"), Some(b(b"v2")));
        assert_eq!(engine.get(old.store_key()), None);
        assert_eq!(engine.store_count(), 1);
    }

    #[test]
    fn test_count_formula() {
        let (engine, _) = engine();

        for i in 0..3 {
            engine
                .add(&format!("direct:{}", i), b(&[i]), EntryPolicy::no_expiry())
                .unwrap();
        }
        engine.add_interned("shared:1", b(b"payload")).unwrap();
        engine.add_interned("shared:2", b(b"payload")).unwrap();

        assert_eq!(engine.count(), 5);
        assert_eq!(engine.store_count(), 4);
    }

    #[test]
    fn test_remove_missing_key() {
        let (engine, metrics) = engine();
        assert_eq!(engine.remove("absent"), None);
        assert_eq!(metrics.snapshot().removes, 1);
    }

    #[test]
    fn test_remove_of_content_key_is_refused() {
        let (engine, _) = engine();

        engine.add_interned("k", b(b"v")).unwrap();
        let hash: ContentHash = Sha256Hasher.hash(b"v");

        assert_eq!(engine.remove(hash.store_key()), None);
        assert_eq!(engine.get("k"), Some(b(b"v")));
        // Reading the content key directly is allowed
        assert_eq!(engine.get(hash.store_key()), Some(b(b"v")));
    }

    #[test]
    fn test_interned_binding_shadows_direct_entry() {
        let (engine, _) = engine();

        engine.add("k", b(b"direct"), EntryPolicy::no_expiry()).unwrap();
        engine.add_interned("k", b(b"interned")).unwrap();

        assert_eq!(engine.get("k"), Some(b(b"interned")));
        assert_eq!(engine.count(), 2);

        assert_eq!(engine.remove("k"), Some(b(b"interned")));
        assert_eq!(engine.get("k"), Some(b(b"direct")));
    }

    #[test]
    fn test_counters_track_calls() {
        let (engine, metrics) = engine();

        engine.add("a", b(b"1"), EntryPolicy::no_expiry()).unwrap();
        engine.add_interned("b", b(b"2")).unwrap();
        engine.get("a");
        engine.get("missing");
        engine.remove("a");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.adds, 2);
        assert_eq!(snapshot.gets, 2);
        assert_eq!(snapshot.removes, 1);
    }

    #[test]
    fn test_clear_swaps_store_and_drops_bindings() {
        let (engine, _) = engine();

        engine.add("user:1", b(b"x"), EntryPolicy::no_expiry()).unwrap();
        engine.add_interned("doc:a", b(b"y")).unwrap();

        engine.clear();

        assert_eq!(engine.get("user:1"), None);
        assert_eq!(engine.get("doc:a"), None);
        assert!(!engine.is_interned("doc:a"));
        assert_eq!(engine.count(), 0);
        assert!(engine.keys("*").unwrap().is_empty());

        // Interning after a clear starts from a clean refcount
        engine.add_interned("doc:a", b(b"y")).unwrap();
        assert_eq!(engine.refcount_of("doc:a"), 1);
        assert_eq!(engine.get("doc:a"), Some(b(b"y")));
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let (engine, _) = engine();
        let before = engine.memory_limit_mb();
        engine.clear();
        assert_eq!(engine.memory_limit_mb(), before);
        assert_eq!(engine.capacity().limit_bytes(), 1024 * 1024);
    }

    #[test]
    fn test_keys_patterns() {
        let (engine, _) = engine();

        engine.add("User:1", b(b"a"), EntryPolicy::no_expiry()).unwrap();
        engine.add("user:2", b(b"b"), EntryPolicy::no_expiry()).unwrap();
        engine.add("order:1", b(b"c"), EntryPolicy::no_expiry()).unwrap();
        engine.add_interned("doc", b(b"d")).unwrap();

        assert_eq!(engine.keys("").unwrap().len(), 4);
        assert_eq!(engine.keys("*").unwrap().len(), 4);
        assert_eq!(engine.keys("^user:").unwrap(), vec!["User:1", "user:2"]);
        assert_eq!(engine.keys("^interned:").unwrap().len(), 1);
        assert!(engine.keys("nothing-matches").unwrap().is_empty());
    }

    #[test]
    fn test_keys_malformed_pattern() {
        let (engine, _) = engine();
        engine.add("a", b(b"1"), EntryPolicy::no_expiry()).unwrap();

        assert!(matches!(
            engine.keys("(unclosed"),
            Err(CacheError::MalformedPattern(_))
        ));
        // The engine keeps working afterwards
        assert_eq!(engine.keys("*").unwrap(), vec!["a"]);
    }

    #[test]
    fn test_trim_spares_interned_content() {
        let metrics = Arc::new(CacheMetrics::new());
        let engine = CacheEngine::new(MemoryCapacity::from_bytes(1), metrics);

        engine.add("direct", b(b"evictable"), EntryPolicy::no_expiry()).unwrap();
        engine.add_interned("doc", b(b"pinned")).unwrap();

        let report = engine.trim();
        assert_eq!(report.evicted, 1);
        assert_eq!(engine.get("direct"), None);
        assert_eq!(engine.get("doc"), Some(b(b"pinned")));
    }

    #[test]
    fn test_expired_direct_entry_reads_as_missing() {
        let (engine, _) = engine();

        engine
            .add("temp", b(b"v"), EntryPolicy::ttl(Duration::from_millis(30)))
            .unwrap();
        sleep(Duration::from_millis(60));

        assert_eq!(engine.get("temp"), None);
        assert_eq!(engine.remove("temp"), None);
    }

    #[test]
    fn test_pinned_direct_entry_survives_trim() {
        let metrics = Arc::new(CacheMetrics::new());
        let engine = CacheEngine::new(MemoryCapacity::from_bytes(1), metrics);

        engine
            .add("keep", b(b"v"), EntryPolicy::no_expiry().with_priority(Priority::Pinned))
            .unwrap();
        engine.trim();

        assert_eq!(engine.get("keep"), Some(b(b"v")));
        assert_eq!(engine.remove("keep"), Some(b(b"v")));
    }

    #[test]
    fn test_concurrent_intern_and_release_same_key() {
        let (engine, _) = engine();
        let engine = Arc::new(engine);

        std::thread::scope(|scope| {
            for t in 0..8u8 {
                let engine = Arc::clone(&engine);
                scope.spawn(move || {
                    for i in 0..200u32 {
                        let payload = [t % 2, (i % 3) as u8];
                        engine.add_interned("hot", b(&payload)).unwrap();
                        engine.add_interned(&format!("cold:{}", t), b(&payload)).unwrap();
                        engine.remove("hot");
                    }
                });
            }
        });

        {
            let interns = engine.interns.lock();
            let store = engine.store.read();
            assert!(interns.is_consistent(&store));
        }

        // Only the per-thread keys can still be bound
        assert!(!engine.is_interned("hot") || engine.refcount_of("hot") >= 1);
        for t in 0..8 {
            assert!(engine.refcount_of(&format!("cold:{}", t)) >= 1);
        }
    }

    #[test]
    fn test_get_never_misses_while_key_is_rebound() {
        let (engine, _) = engine();
        let engine = Arc::new(engine);
        engine.add_interned("k", b(b"a")).unwrap();

        let misses = std::thread::scope(|scope| {
            let writer = Arc::clone(&engine);
            scope.spawn(move || {
                for i in 0..20_000 {
                    let value: &[u8] = if i % 2 == 0 { b"b" } else { b"a" };
                    writer.add_interned("k", b(value)).unwrap();
                }
            });

            let reader = Arc::clone(&engine);
            scope
                .spawn(move || {
                    (0..20_000)
                        .filter(|_| reader.get("k").is_none())
                        .count()
                })
                .join()
                .unwrap()
        });

        assert_eq!(misses, 0);
    }

    #[test]
    fn test_clear_races_with_writers() {
        let (engine, _) = engine();
        let engine = Arc::new(engine);

        std::thread::scope(|scope| {
            for t in 0..4u8 {
                let engine = Arc::clone(&engine);
                scope.spawn(move || {
                    for i in 0..200u8 {
                        engine.add_interned(&format!("k{}", i % 10), b(&[t, i % 4])).unwrap();
                        engine.add(&format!("d{}", i), b(&[i]), EntryPolicy::no_expiry()).unwrap();
                        engine.remove(&format!("k{}", (i + 5) % 10));
                    }
                });
            }
            let engine = Arc::clone(&engine);
            scope.spawn(move || {
                for _ in 0..20 {
                    engine.clear();
                }
            });
        });

        let interns = engine.interns.lock();
        let store = engine.store.read();
        assert!(interns.is_consistent(&store));
    }
}
