//! Keyed async mutexes for single-flight coordination
//!
//! Collapses concurrent work on the same key into one flight: every caller
//! for a key awaits the same mutex, performs a double-check of its cache
//! under the lock, and only the first through performs the expensive
//! operation. Used by the credential manager so concurrent token requests
//! for one payer trigger exactly one upstream grant.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

/// A map of lazily-created `tokio::sync::Mutex`es, one per key.
///
/// Entries are created on first use and kept for the life of the registry;
/// the key space here (payer ids, order ids) is small and bounded.
pub struct KeyedMutex<K>
where
    K: Eq + Hash + Clone,
{
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K> KeyedMutex<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self { locks: DashMap::new() }
    }

    /// The shared mutex for `key`, created on first access.
    ///
    /// Callers lock the returned handle, re-check their cache, and perform
    /// the guarded work while holding it.
    pub fn lock_for(&self, key: &K) -> Arc<Mutex<()>> {
        self.locks.entry(key.clone()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Number of keys with a materialized lock (diagnostics only).
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl<K> Default for KeyedMutex<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
