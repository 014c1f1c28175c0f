//! Type algebra for the Pkl semantic core.
//!
//! This crate provides:
//! - `Type`, the closed type representation
//! - Normalizing constructors (`Type::union`, `Type::class`, `Type::module`)
//! - Subtyping, equivalence and common-subtype queries
//! - Nullability, amend and instantiate projections
//! - Type-parameter binding and alias expansion
//! - Rendering back to Pkl syntax
//! - Static evaluation of constants and type constraints
//!
//! Every query takes a `&dyn TypeContext`, which supplies the standard
//! library model, syntax trees and declared supertypes. Recursion through
//! user-written cycles is cut by the per-request `InFlight` guard.

pub mod base;
pub mod bindings;
pub mod constraint;
pub mod context;
pub mod in_flight;
pub mod ops;
pub mod render;
pub mod subtype;
pub mod types;

pub use base::{Base, BaseError};
pub use bindings::TypeParameterBindings;
pub use constraint::{ConstantValue, ConstraintValue, constant_value, evaluate_constraint};
pub use context::{TypeContext, decl_name, type_params_of, with_node};
pub use in_flight::{EnterResult, InFlight, InFlightKey, InFlightToken};
pub use render::{FullNameRenderer, NameRenderer, SimpleNameRenderer};
pub use subtype::{class_extends, module_extends, project_to, supertype_of};
pub use types::{
    AliasType, ClassType, Constraints, ModuleType, StringLiteralType, Type, UnionType, VariableType,
};
