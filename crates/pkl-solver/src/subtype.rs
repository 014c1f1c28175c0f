//! Subtyping, equivalence and common-subtype queries.
//!
//! Constraints never participate here: `Int(isPositive)` and `Int` are
//! mutual subtypes. Constraint checking is the type-check engine's job.

use pkl_common::limits::{MAX_MODULE_CHAIN, MAX_SUBTYPE_DEPTH, MAX_SUPERTYPE_CHAIN};
use pkl_syntax::{ModuleId, NodeRef, Variance};
use rustc_hash::FxHashSet;
use tracing::trace;

use crate::bindings::TypeParameterBindings;
use crate::context::{TypeContext, type_params_of};
use crate::types::{ClassType, Type};

impl Type {
    /// `self <: other`. Reflexive; `Unknown` relates to everything in both
    /// directions and `Nothing` is a subtype of everything.
    pub fn is_subtype_of(&self, other: &Type, ctx: &dyn TypeContext) -> bool {
        subtype(self, other, ctx, 0)
    }

    /// Mutual subtyping. Note that `Unknown` is equivalent to every type.
    pub fn is_equivalent_to(&self, other: &Type, ctx: &dyn TypeContext) -> bool {
        self.is_subtype_of(other, ctx) && other.is_subtype_of(self, ctx)
    }

    /// Whether some refinement of `self` could satisfy `other`.
    ///
    /// Used to tell a hard type error from a weak one. `Unknown` and
    /// `Nothing` are never witnesses: the answer is `false` whenever `self`
    /// is one of them, even though both are subtypes of everything.
    pub fn has_common_subtype_with(&self, other: &Type, ctx: &dyn TypeContext) -> bool {
        common_subtype(self, other, ctx, 0)
    }
}

fn subtype(t: &Type, u: &Type, ctx: &dyn TypeContext, depth: u32) -> bool {
    if depth > MAX_SUBTYPE_DEPTH {
        trace!("subtype depth exceeded, assuming related");
        return true;
    }
    if t == u {
        return true;
    }
    let depth = depth + 1;
    let base = ctx.base();
    match (t, u) {
        (_, Type::Unknown) | (Type::Unknown, _) | (Type::Nothing, _) => true,
        (_, Type::Nothing) => false,
        (Type::Union(a), _) => {
            subtype(&a.left, u, ctx, depth) && subtype(&a.right, u, ctx, depth)
        }
        (Type::Alias(_), _) => subtype(&t.unaliased(ctx), u, ctx, depth),
        (_, Type::Alias(_)) => subtype(t, &u.unaliased(ctx), ctx, depth),
        (_, Type::Union(b)) => {
            subtype(t, &b.left, ctx, depth) || subtype(t, &b.right, ctx, depth)
        }
        (Type::Variable(a), Type::Variable(b)) => a.param == b.param,
        (Type::Variable(_), Type::Class(b)) => b.decl == base.any,
        (Type::Variable(_), _) => false,
        (Type::StringLiteral(a), Type::StringLiteral(b)) => a.value == b.value,
        (Type::StringLiteral(_), _) => subtype(&base.string_type(), u, ctx, depth),
        (Type::Class(a), Type::Class(b)) => class_subtype(a, b, ctx, depth),
        (Type::Module(a), Type::Module(b)) => module_extends(a.module, b.module, ctx),
        (Type::Module(_), Type::Class(_)) => subtype(&base.module_class_type(), u, ctx, depth),
        (Type::Class(_) | Type::Module(_), _) => false,
    }
}

fn class_subtype(a: &ClassType, b: &ClassType, ctx: &dyn TypeContext, depth: u32) -> bool {
    match project_to(a, b.decl, ctx) {
        Some(projected) => args_conform(&projected, b, ctx, depth),
        None => false,
    }
}

/// Type arguments of `actual` against `expected` (same class), per the
/// declared variance of each parameter.
fn args_conform(actual: &ClassType, expected: &ClassType, ctx: &dyn TypeContext, depth: u32) -> bool {
    let params = type_params_of(ctx, expected.decl);
    params
        .iter()
        .zip(actual.type_args.iter().zip(expected.type_args.iter()))
        .all(|(&(_, variance), (x, y))| match variance {
            Variance::Out => subtype(x, y, ctx, depth),
            Variance::In => subtype(y, x, ctx, depth),
            Variance::Invariant => subtype(x, y, ctx, depth) && subtype(y, x, ctx, depth),
        })
}

/// Direct supertype of a class type, with the class's type arguments
/// substituted. `None` for the root class or when the supertype does not
/// resolve to a class.
pub fn supertype_of(class: &ClassType, ctx: &dyn TypeContext) -> Option<ClassType> {
    let declared = ctx.supertype(class.decl)?;
    let bindings = TypeParameterBindings::for_declaration(class.decl, &class.type_args, ctx);
    match declared.bind(&bindings).unaliased(ctx) {
        Type::Class(parent) => Some(parent),
        _ => None,
    }
}

/// Walk `class`'s supertype chain up to `target`, returning the matching
/// ancestor with its type arguments expressed in terms of `class`'s.
pub fn project_to(class: &ClassType, target: NodeRef, ctx: &dyn TypeContext) -> Option<ClassType> {
    let mut current = class.clone();
    let mut seen = FxHashSet::default();
    for _ in 0..MAX_SUPERTYPE_CHAIN {
        if current.decl == target {
            return Some(current);
        }
        if !seen.insert(current.decl) {
            trace!(decl = ?current.decl, "cyclic class hierarchy");
            return None;
        }
        current = supertype_of(&current, ctx)?;
    }
    None
}

/// Nominal subclass test on declarations, ignoring type arguments.
pub fn class_extends(decl: NodeRef, ancestor: NodeRef, ctx: &dyn TypeContext) -> bool {
    let start = ClassType {
        decl,
        type_args: Vec::new().into(),
        constraints: Default::default(),
    };
    project_to(&start, ancestor, ctx).is_some()
}

/// Whether `sub` reaches `sup` through `extends`/`amends` clauses.
pub fn module_extends(sub: ModuleId, sup: ModuleId, ctx: &dyn TypeContext) -> bool {
    let mut current = sub;
    let mut seen = FxHashSet::default();
    for _ in 0..MAX_MODULE_CHAIN {
        if current == sup {
            return true;
        }
        if !seen.insert(current) {
            return false;
        }
        match ctx.supermodule(current) {
            Some(next) => current = next,
            None => return false,
        }
    }
    false
}

fn common_subtype(t: &Type, u: &Type, ctx: &dyn TypeContext, depth: u32) -> bool {
    if depth > MAX_SUBTYPE_DEPTH {
        return true;
    }
    let depth = depth + 1;
    match (t, u) {
        // Vacuous witnesses would suppress real type errors.
        (Type::Unknown | Type::Nothing, _) => false,
        (_, Type::Unknown) => true,
        (_, Type::Nothing) => false,
        (Type::Union(a), _) => {
            common_subtype(&a.left, u, ctx, depth) || common_subtype(&a.right, u, ctx, depth)
        }
        (_, Type::Union(b)) => {
            common_subtype(t, &b.left, ctx, depth) || common_subtype(t, &b.right, ctx, depth)
        }
        (Type::Alias(_), _) => common_subtype(&t.unaliased(ctx), u, ctx, depth),
        (_, Type::Alias(_)) => common_subtype(t, &u.unaliased(ctx), ctx, depth),
        (Type::Variable(_), _) | (_, Type::Variable(_)) => true,
        (Type::StringLiteral(_), _) => subtype(t, u, ctx, depth),
        (_, Type::StringLiteral(_)) => subtype(u, t, ctx, depth),
        (Type::Class(a), Type::Class(b)) => classes_overlap(a, b, ctx, depth),
        (Type::Module(_), _) | (_, Type::Module(_)) => {
            subtype(t, u, ctx, depth) || subtype(u, t, ctx, depth)
        }
    }
}

fn classes_overlap(a: &ClassType, b: &ClassType, ctx: &dyn TypeContext, depth: u32) -> bool {
    let (lower, upper) = if let Some(projected) = project_to(a, b.decl, ctx) {
        (projected, b.clone())
    } else if let Some(projected) = project_to(b, a.decl, ctx) {
        (a.clone(), projected)
    } else {
        return false;
    };
    lower
        .type_args
        .iter()
        .zip(upper.type_args.iter())
        .all(|(x, y)| x.is_unknown() || y.is_unknown() || common_subtype(x, y, ctx, depth))
}
