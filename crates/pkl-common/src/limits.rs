//! Centralized limits and thresholds for the analyzers.
//!
//! Walks over user-controlled structures (class hierarchies, amends chains,
//! syntax-tree ancestors) are bounded so that malformed or cyclic input
//! degrades to "insufficient information" instead of a hang.

// =============================================================================
// Walk Limits
// =============================================================================

/// Maximum number of ancestors visited when walking up a syntax tree.
pub const MAX_TREE_WALK_ITERATIONS: u32 = 10_000;

/// Maximum length of a class `extends` chain before the walk gives up.
///
/// ```pkl
/// class A extends B
/// class B extends A   // cycle: the walk stops instead of looping
/// ```
pub const MAX_SUPERTYPE_CHAIN: u32 = 100;

/// Maximum length of a module `amends`/`extends` chain.
pub const MAX_MODULE_CHAIN: u32 = 100;

// =============================================================================
// Recursion Depth Limits
// =============================================================================

/// Maximum nesting depth for expression type computation.
///
/// Deeply nested expressions bail out with `unknown` past this depth.
pub const MAX_EXPR_TYPE_DEPTH: u32 = 500;

/// Maximum nesting depth of a subtype or common-subtype query.
///
/// Only reachable through recursive aliases (`typealias A = List<A>`
/// compared against another self-referential alias); past this depth the
/// query assumes the relation holds.
pub const MAX_SUBTYPE_DEPTH: u32 = 100;

/// Maximum nesting depth while distributing a type check over unions and
/// aliases.
pub const MAX_TYPE_CHECK_DEPTH: u32 = 64;

/// Maximum nesting depth while evaluating a constant or constraint expression.
pub const MAX_CONSTANT_EVAL_DEPTH: u32 = 200;
