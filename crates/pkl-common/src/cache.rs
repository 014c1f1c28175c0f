//! Dependency-tracked value cache.
//!
//! `CacheStore` memoizes derived values (diagnostics, member indexes,
//! resolved project dependencies) under caller-constructed string keys. Each
//! entry records the counters of its `ModificationTracker` dependencies at
//! write time; the entry is valid iff every dependency still reports the same
//! counter, compared pairwise by position.
//!
//! Keys must embed enough identity (e.g. a module URI) to avoid collisions
//! between entities. The store performs no invalidation sweep: stale entries
//! live until they are overwritten or the store is dropped.
//!
//! `get_cached_value` is not atomic end-to-end. Two tasks racing on the same
//! stale key both compute and the last write wins; since results are pure
//! functions of their dependency counters this is duplicate work, not
//! corruption.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tracing::{debug, trace, warn};

use crate::modification::ModificationTracker;

/// A freshly computed value together with the trackers it depends on.
pub struct CachedValue<T> {
    pub value: T,
    pub dependencies: Vec<Arc<ModificationTracker>>,
}

impl<T> CachedValue<T> {
    pub fn new(value: T, dependencies: Vec<Arc<ModificationTracker>>) -> Self {
        Self {
            value,
            dependencies,
        }
    }
}

struct StoredEntry {
    value: Arc<dyn Any + Send + Sync>,
    dependencies: Vec<Arc<ModificationTracker>>,
    counts: Vec<u64>,
}

impl StoredEntry {
    fn is_valid(&self) -> bool {
        assert_eq!(
            self.dependencies.len(),
            self.counts.len(),
            "cache entry dependency list and recorded counters differ in length"
        );
        self.dependencies
            .iter()
            .zip(&self.counts)
            .all(|(dependency, &count)| dependency.modification_count() == count)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Concurrent store of dependency-tracked values.
#[derive(Default)]
pub struct CacheStore {
    entries: DashMap<String, StoredEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the value stored under `key` if all of its dependencies are
    /// unchanged; otherwise run `compute`, store its result and return it.
    ///
    /// `compute` may return `None` ("nothing to cache"), in which case no
    /// entry is written and `None` is returned.
    pub fn get_cached_value<T, F>(&self, key: &str, compute: F) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Option<CachedValue<T>>,
    {
        // The shard guard must be released before `compute` runs: compute may
        // itself consult the cache.
        if let Some(hit) = self.lookup_valid::<T>(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key, "cache hit");
            return Some(hit);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key, "cache miss, computing");

        let computed = compute()?;
        let counts = computed
            .dependencies
            .iter()
            .map(|dependency| dependency.modification_count())
            .collect();
        let value = computed.value.clone();
        self.entries.insert(
            key.to_string(),
            StoredEntry {
                value: Arc::new(computed.value),
                dependencies: computed.dependencies,
                counts,
            },
        );
        Some(value)
    }

    fn lookup_valid<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let entry = self.entries.get(key)?;
        if !entry.is_valid() {
            return None;
        }
        match entry.value.downcast_ref::<T>() {
            Some(value) => Some(value.clone()),
            None => {
                warn!(key, "cache entry holds a value of a different type");
                None
            }
        }
    }

    /// Whether a valid entry currently exists for `key`.
    pub fn contains_valid(&self, key: &str) -> bool {
        self.entries.get(key).is_some_and(|entry| entry.is_valid())
    }

    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
#[path = "../tests/cache_tests.rs"]
mod tests;
