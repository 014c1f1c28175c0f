//! Common types and utilities for the Pkl language server.
//!
//! This crate provides foundational types used across all pkl crates:
//! - Source spans (`Span`)
//! - Diagnostics records and the message catalogue
//! - Analysis limits and thresholds
//! - Modification trackers and the dependency-tracked value cache
//! - Tracing subscriber initialisation

// Span - Source location tracking (byte offsets)
pub mod span;
pub use span::Span;

// Diagnostics produced by analyzers
pub mod diagnostics;
pub use diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSeverity, QuickFix};

// Centralized limits and thresholds
pub mod limits;

// Modification counters owned by whoever observes a change
pub mod modification;
pub use modification::ModificationTracker;

// Dependency-tracked memoization
pub mod cache;
pub use cache::{CacheStats, CacheStore, CachedValue};

// Logging setup for the server binary and tests
pub mod tracing_config;
