//! Modification counters.
//!
//! A `ModificationTracker` is created once per logical "thing that can go
//! stale" (a module's content, the project sync state, the package download
//! stream). The component that observes the underlying event owns the
//! increment; everyone else only reads the counter.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for tracker identities, used in trace output only.
static NEXT_TRACKER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub struct ModificationTracker {
    id: u64,
    name: &'static str,
    count: AtomicU64,
}

impl ModificationTracker {
    pub fn new(name: &'static str) -> Self {
        Self {
            id: NEXT_TRACKER_ID.fetch_add(1, Ordering::Relaxed),
            name,
            count: AtomicU64::new(0),
        }
    }

    /// Current counter value. Never blocks.
    #[inline]
    pub fn modification_count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    /// Record that the tracked thing changed. Returns the new counter value.
    pub fn increment(&self) -> u64 {
        let next = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::trace!(tracker = self.name, id = self.id, count = next, "modification");
        next
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
