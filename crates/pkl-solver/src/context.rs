//! The seam between the type algebra and whoever owns syntax trees.
//!
//! The algebra never reaches for a global standard library or a global
//! module table: every query takes a `&dyn TypeContext`. The checker
//! implements it on top of name resolution; tests implement it over a
//! handful of hand-built trees.

use std::sync::Arc;

use pkl_syntax::{ModuleClauseKind, ModuleId, NodeData, NodeRef, SyntaxTree, Variance};
use smallvec::SmallVec;

use crate::base::Base;
use crate::in_flight::InFlight;
use crate::types::Type;

pub trait TypeContext {
    /// The standard-library model.
    fn base(&self) -> &Base;

    fn tree(&self, module: ModuleId) -> Option<Arc<SyntaxTree>>;

    /// Recursion guard of the current request.
    fn in_flight(&self) -> &InFlight;

    /// Declared supertype of a class, expressed over the class's own type
    /// parameters (as `Type::Variable`s). `None` only for the root class.
    fn supertype(&self, class: NodeRef) -> Option<Type>;

    /// The right-hand side of a type alias, expressed over the alias's own
    /// type parameters.
    fn aliased_type(&self, alias: NodeRef) -> Type;

    /// Target of a module's `amends` or `extends` clause, if it resolves.
    fn supermodule(&self, module: ModuleId) -> Option<ModuleId>;
}

/// Run `f` on the data of `node`, if its tree is available.
pub fn with_node<R>(
    ctx: &dyn TypeContext,
    node: NodeRef,
    f: impl FnOnce(&SyntaxTree, &NodeData) -> R,
) -> Option<R> {
    let tree = ctx.tree(node.module)?;
    let data = tree.data(node.node)?;
    Some(f(&tree, data))
}

pub fn decl_name(ctx: &dyn TypeContext, node: NodeRef) -> Option<String> {
    with_node(ctx, node, |_, data| data.name().map(str::to_string)).flatten()
}

/// Type parameters of a class, alias or method, with their variance.
pub fn type_params_of(ctx: &dyn TypeContext, decl: NodeRef) -> SmallVec<[(NodeRef, Variance); 4]> {
    with_node(ctx, decl, |tree, data| {
        let params = match data {
            NodeData::Class { type_params, .. }
            | NodeData::TypeAlias { type_params, .. }
            | NodeData::Method { type_params, .. } => type_params.as_slice(),
            _ => &[],
        };
        params
            .iter()
            .map(|&param| {
                let variance = match tree.data(param) {
                    Some(NodeData::TypeParameter { variance, .. }) => *variance,
                    _ => Variance::Invariant,
                };
                (decl.with_node(param), variance)
            })
            .collect()
    })
    .unwrap_or_default()
}

pub fn module_clause_kind(ctx: &dyn TypeContext, module: ModuleId) -> Option<ModuleClauseKind> {
    ctx.tree(module)?.module_clause().map(|clause| clause.kind)
}
