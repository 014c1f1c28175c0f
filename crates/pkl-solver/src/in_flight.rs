//! Per-task recursion guard.
//!
//! Alias expansion, supertype walks, expression typing and constant
//! evaluation can re-enter themselves through user-written cycles
//! (`typealias A = A|String`, a property whose value reads itself). Each
//! computation enters a key into the request's `InFlight` set; re-entry on
//! the same key is reported as a cycle and the caller falls back to a safe
//! default (usually `Type::Unknown`).
//!
//! The set belongs to one logical request, not to an OS thread: analysis may
//! run on a thread pool and a worker thread is reused across requests. Entries
//! are released by an RAII token, so they are cleared on normal return and
//! while unwinding alike.

use std::cell::{Cell, RefCell};

use pkl_common::limits::MAX_EXPR_TYPE_DEPTH;
use pkl_syntax::{ModuleId, NodeRef};
use rustc_hash::FxHashSet;

/// Identity of one in-flight computation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum InFlightKey {
    AliasExpansion(NodeRef),
    Supertype(NodeRef),
    ExprType(NodeRef),
    MemberType(NodeRef),
    ThisType(NodeRef),
    ExpectedType(NodeRef),
    ConstantValue(NodeRef),
    ModuleChain(ModuleId),
}

/// Result of attempting to enter a computation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EnterResult {
    /// This key is already being computed further up the stack.
    Cycle,
    /// Too many nested computations.
    DepthExceeded,
}

pub struct InFlight {
    visiting: RefCell<FxHashSet<InFlightKey>>,
    depth: Cell<u32>,
    max_depth: u32,
    /// Number of refused entries so far. A result computed while this
    /// moved may contain a fallback and must not be memoized.
    fallbacks: Cell<u32>,
}

impl Default for InFlight {
    fn default() -> Self {
        Self::new()
    }
}

impl InFlight {
    pub fn new() -> Self {
        Self::with_max_depth(MAX_EXPR_TYPE_DEPTH)
    }

    pub fn with_max_depth(max_depth: u32) -> Self {
        Self {
            visiting: RefCell::new(FxHashSet::default()),
            depth: Cell::new(0),
            max_depth,
            fallbacks: Cell::new(0),
        }
    }

    /// Try to enter `key`. The returned token leaves it when dropped.
    pub fn enter(&self, key: InFlightKey) -> Result<InFlightToken<'_>, EnterResult> {
        if self.depth.get() >= self.max_depth {
            tracing::debug!(?key, depth = self.depth.get(), "in-flight depth exceeded");
            self.fallbacks.set(self.fallbacks.get() + 1);
            return Err(EnterResult::DepthExceeded);
        }
        if !self.visiting.borrow_mut().insert(key) {
            tracing::trace!(?key, "in-flight cycle");
            self.fallbacks.set(self.fallbacks.get() + 1);
            return Err(EnterResult::Cycle);
        }
        self.depth.set(self.depth.get() + 1);
        Ok(InFlightToken { owner: self, key })
    }

    /// Run `f` inside a guarded scope, or return `on_cycle` when `key` is
    /// already in flight (or nesting is too deep).
    pub fn scope<T>(&self, key: InFlightKey, on_cycle: T, f: impl FnOnce() -> T) -> T {
        match self.enter(key) {
            Ok(_token) => f(),
            Err(_) => on_cycle,
        }
    }

    #[inline]
    pub fn is_visiting(&self, key: &InFlightKey) -> bool {
        self.visiting.borrow().contains(key)
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth.get()
    }

    #[inline]
    pub fn fallback_count(&self) -> u32 {
        self.fallbacks.get()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.visiting.borrow().is_empty()
    }

    fn leave(&self, key: InFlightKey) {
        let was_present = self.visiting.borrow_mut().remove(&key);
        debug_assert!(
            was_present,
            "InFlight::leave() called with a key that is not in the visiting set"
        );
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

/// Leaves its key when dropped.
#[must_use = "dropping the token immediately leaves the computation"]
pub struct InFlightToken<'a> {
    owner: &'a InFlight,
    key: InFlightKey,
}

impl Drop for InFlightToken<'_> {
    fn drop(&mut self) {
        self.owner.leave(self.key);
    }
}

#[cfg(debug_assertions)]
impl Drop for InFlight {
    fn drop(&mut self) {
        if !std::thread::panicking() && !self.visiting.get_mut().is_empty() {
            panic!(
                "InFlight dropped with {} active entries still in the visiting set",
                self.visiting.get_mut().len(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkl_syntax::NodeIndex;

    fn key(n: u32) -> InFlightKey {
        InFlightKey::AliasExpansion(NodeRef::new(ModuleId(1), NodeIndex(n)))
    }

    #[test]
    fn test_reentry_is_a_cycle() {
        let in_flight = InFlight::new();
        let _outer = in_flight.enter(key(1)).expect("first entry");
        assert_eq!(in_flight.enter(key(1)).err(), Some(EnterResult::Cycle));
        assert!(in_flight.enter(key(2)).is_ok());
    }

    #[test]
    fn test_token_drop_clears_entry() {
        let in_flight = InFlight::new();
        {
            let _token = in_flight.enter(key(1)).expect("entry");
            assert!(in_flight.is_visiting(&key(1)));
            assert_eq!(in_flight.depth(), 1);
        }
        assert!(in_flight.is_empty());
        assert_eq!(in_flight.depth(), 0);
    }

    #[test]
    fn test_entry_cleared_on_unwind() {
        let in_flight = InFlight::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            in_flight.scope(key(1), (), || panic!("analysis bug"));
        }));
        assert!(result.is_err());
        assert!(in_flight.is_empty());
        assert!(in_flight.enter(key(1)).is_ok());
    }

    #[test]
    fn test_depth_limit() {
        let in_flight = InFlight::with_max_depth(2);
        let _a = in_flight.enter(key(1)).expect("a");
        let _b = in_flight.enter(key(2)).expect("b");
        assert_eq!(in_flight.enter(key(3)).err(), Some(EnterResult::DepthExceeded));
    }

    #[test]
    fn test_scope_returns_fallback_on_cycle() {
        let in_flight = InFlight::new();
        let value = in_flight.scope(key(1), 0, || in_flight.scope(key(1), -1, || 42));
        assert_eq!(value, -1);
        assert_eq!(in_flight.fallback_count(), 1);
    }
}
