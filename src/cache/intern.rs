//! Intern Table Module
//!
//! Deduplicates payloads by content. Each distinct payload is stored once in
//! the bounded store under its content hash, pinned, and shared by every key
//! bound to that hash. A per-hash reference count decides when the physical
//! copy can go.
//!
//! The binding map and the refcount map only change together, inside one
//! critical section held through an [`InternGuard`]. Callers take the intern
//! lock before touching the store.

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::{Mutex, MutexGuard};

use crate::cache::{BoundedStore, ContentHash, EntryPolicy};

// == Outcomes ==
/// Result of binding a key to content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternOutcome {
    /// First reference to this content; a pinned entry was created
    Created,
    /// Content already stored; its refcount went up
    Shared,
    /// Key was already bound to identical content; nothing changed
    Unchanged,
}

/// Result of releasing a key's binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Release {
    /// Last reference dropped; the physical entry was deleted
    Removed(Option<Bytes>),
    /// Other keys still reference the content, which stays cached
    StillReferenced(Option<Bytes>),
}

impl Release {
    pub fn into_value(self) -> Option<Bytes> {
        match self {
            Release::Removed(value) | Release::StillReferenced(value) => value,
        }
    }
}

#[derive(Debug, Default)]
struct InternState {
    bindings: HashMap<String, ContentHash>,
    refcounts: HashMap<ContentHash, usize>,
}

// == Intern Table ==
#[derive(Debug, Default)]
pub struct InternTable {
    state: Mutex<InternState>,
}

impl InternTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters the intern critical section.
    pub fn lock(&self) -> InternGuard<'_> {
        InternGuard {
            state: self.state.lock(),
        }
    }
}

/// Exclusive access to the binding and refcount maps.
pub struct InternGuard<'a> {
    state: MutexGuard<'a, InternState>,
}

impl InternGuard<'_> {
    // == Intern ==
    /// Binds `key` to the content `value` hashed as `hash`.
    ///
    /// A previous binding of `key` to other content gives up its reference
    /// first, deleting that content if nobody else holds it.
    pub fn intern(
        &mut self,
        key: &str,
        hash: ContentHash,
        value: Bytes,
        store: &BoundedStore,
    ) -> InternOutcome {
        if self.state.bindings.get(key) == Some(&hash) {
            if !store.contains(hash.store_key()) {
                store.set(hash.store_key(), value, EntryPolicy::pinned());
            }
            return InternOutcome::Unchanged;
        }

        if let Some(previous) = self.state.bindings.insert(key.to_string(), hash.clone()) {
            self.drop_reference(&previous, store);
        }

        let count = self.state.refcounts.entry(hash.clone()).or_insert(0);
        let outcome = if *count == 0 {
            store.set(hash.store_key(), value, EntryPolicy::pinned());
            InternOutcome::Created
        } else {
            InternOutcome::Shared
        };
        *count += 1;
        outcome
    }

    // == Lookup ==
    /// Returns the content hash `key` is bound to.
    pub fn lookup(&self, key: &str) -> Option<ContentHash> {
        self.state.bindings.get(key).cloned()
    }

    // == Release ==
    /// Unbinds `key`. Returns None if it was not interned.
    pub fn release(&mut self, key: &str, store: &BoundedStore) -> Option<Release> {
        let hash = self.state.bindings.remove(key)?;
        Some(self.drop_reference(&hash, store))
    }

    fn drop_reference(&mut self, hash: &ContentHash, store: &BoundedStore) -> Release {
        let remaining = match self.state.refcounts.get_mut(hash) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => 0,
        };

        if remaining == 0 {
            self.state.refcounts.remove(hash);
            Release::Removed(store.remove(hash.store_key()))
        } else {
            Release::StillReferenced(store.get(hash.store_key()))
        }
    }

    /// Number of keys currently bound.
    pub fn binding_count(&self) -> usize {
        self.state.bindings.len()
    }

    /// Number of distinct payloads currently referenced.
    pub fn content_count(&self) -> usize {
        self.state.refcounts.len()
    }

    pub fn refcount(&self, hash: &ContentHash) -> usize {
        self.state.refcounts.get(hash).copied().unwrap_or(0)
    }

    /// Drops every binding and refcount. The store is left untouched.
    pub fn clear(&mut self) {
        self.state.bindings.clear();
        self.state.refcounts.clear();
    }

    /// Checks that refcounts match bindings and that every referenced
    /// payload is present and pinned in `store`.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self, store: &BoundedStore) -> bool {
        let mut expected: HashMap<&ContentHash, usize> = HashMap::new();
        for hash in self.state.bindings.values() {
            *expected.entry(hash).or_insert(0) += 1;
        }

        expected.len() == self.state.refcounts.len()
            && self
                .state
                .refcounts
                .iter()
                .all(|(hash, count)| *count > 0 && expected.get(hash) == Some(count))
            && self
                .state
                .refcounts
                .keys()
                .all(|hash| store.contains(hash.store_key()))
    }
}
