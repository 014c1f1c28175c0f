//! Semantic analysis for Pkl modules.
//!
//! This crate provides:
//! - Scope walking (`resolve`) and the visitors built on it
//! - Types of expressions and type annotations, with flow narrowing
//! - `this`, declaration and expected types
//! - The type-check engine
//! - Completion candidates
//! - Analyzers producing diagnostics
//!
//! Everything runs against a per-request `CheckerContext`.

pub mod analyzers;
pub mod completion;
pub mod context;
mod expr;
pub mod flow;
mod members;
pub mod resolve;
pub mod type_check;
mod type_nodes;
pub mod visitors;

pub use analyzers::{AnalyzerOptions, analyze_module};
pub use completion::{CompletionCollector, CompletionItem, CompletionKind, lambda_parameter_names};
pub use context::{CheckerContext, ModuleProvider};
pub use flow::{FlowFact, FlowFacts};
pub use resolve::{ResolveMode, ResolveVisitor, resolve_qualified_access, resolve_unqualified_access};
pub use type_check::TypeCheckOutcome;
pub use visitors::{CallSite, FirstMatch, Resolved, ShadowSuppressing, TypeOfFirstMatch};
