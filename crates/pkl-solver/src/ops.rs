//! Type constructors that normalize, and the derived projections
//! (nullability, amend/instantiate views, binding and alias expansion).

use pkl_common::limits::MAX_MODULE_CHAIN;
use pkl_syntax::{Modifiers, ModuleClauseKind, ModuleId, NodeRef};
use rustc_hash::FxHashSet;
use tracing::trace;

use crate::bindings::TypeParameterBindings;
use crate::context::{TypeContext, module_clause_kind, type_params_of, with_node};
use crate::in_flight::InFlightKey;
use crate::subtype::class_extends;
use crate::types::{AliasType, ClassType, Constraints, ModuleType, Type, UnionType};

// =============================================================================
// Constructors
// =============================================================================

impl Type {
    /// Class type with `args` padded with `Unknown` (or truncated) to the
    /// class's declared type-parameter count.
    pub fn class(decl: NodeRef, args: Vec<Type>, ctx: &dyn TypeContext) -> Type {
        Type::Class(ClassType {
            decl,
            type_args: fit_args(decl, args, ctx).into(),
            constraints: Constraints::NONE,
        })
    }

    pub fn alias(decl: NodeRef, args: Vec<Type>, ctx: &dyn TypeContext) -> Type {
        Type::Alias(AliasType {
            decl,
            type_args: fit_args(decl, args, ctx).into(),
            constraints: Constraints::NONE,
        })
    }

    /// Module type, normalized to the topmost module of the amends chain
    /// starting at `module`.
    pub fn module(module: ModuleId, reference_name: Option<&str>, ctx: &dyn TypeContext) -> Type {
        Type::Module(ModuleType {
            module: amends_root(module, ctx),
            reference_name: reference_name.map(Into::into),
            constraints: Constraints::NONE,
        })
    }

    /// Normalizing union.
    ///
    /// `Unknown` absorbs, `Nothing` is the identity, and a side that is a
    /// subtype of the other collapses into it as long as neither side carries
    /// constraints. A string literal is kept next to `String` so that
    /// completion can still offer it.
    pub fn union(left: Type, right: Type, ctx: &dyn TypeContext) -> Type {
        match (&left, &right) {
            (Type::Unknown, _) | (_, Type::Unknown) => Type::Unknown,
            (Type::Nothing, _) => right,
            (_, Type::Nothing) => left,
            _ if left == right => left,
            _ if left.has_constraints() || right.has_constraints() => Type::raw_union(left, right),
            _ if collapses_into(&left, &right, ctx) => right,
            _ if collapses_into(&right, &left, ctx) => left,
            _ => Type::raw_union(left, right),
        }
    }

    /// Left fold of `Type::union`; `Nothing` for an empty input.
    pub fn union_all(types: impl IntoIterator<Item = Type>, ctx: &dyn TypeContext) -> Type {
        types
            .into_iter()
            .fold(Type::Nothing, |acc, ty| Type::union(acc, ty, ctx))
    }
}

fn fit_args(decl: NodeRef, mut args: Vec<Type>, ctx: &dyn TypeContext) -> Vec<Type> {
    let arity = type_params_of(ctx, decl).len();
    args.resize(arity, Type::Unknown);
    args
}

fn amends_root(module: ModuleId, ctx: &dyn TypeContext) -> ModuleId {
    let mut current = module;
    let mut seen = FxHashSet::default();
    for _ in 0..MAX_MODULE_CHAIN {
        if !seen.insert(current) {
            trace!(?module, "cyclic amends chain");
            return current;
        }
        if module_clause_kind(ctx, current) != Some(ModuleClauseKind::Amends) {
            return current;
        }
        match ctx.supermodule(current) {
            Some(next) => current = next,
            None => return current,
        }
    }
    current
}

fn collapses_into(narrow: &Type, wide: &Type, ctx: &dyn TypeContext) -> bool {
    if matches!(narrow, Type::StringLiteral(_)) && ctx.base().is_string_class(wide) {
        return false;
    }
    narrow.is_subtype_of(wide, ctx)
}

// =============================================================================
// Projections
// =============================================================================

impl Type {
    /// Whether `null` is a valid value of this type.
    pub fn is_nullable(&self, ctx: &dyn TypeContext) -> bool {
        ctx.base().null_type().is_subtype_of(self, ctx)
    }

    /// `T?`
    pub fn nullable(&self, ctx: &dyn TypeContext) -> Type {
        Type::union(ctx.base().null_type(), self.clone(), ctx)
    }

    /// The type with `Null` removed. Aliases are expanded only when they
    /// actually mention `Null`, so `non_null` of a non-nullable alias keeps
    /// its name.
    pub fn non_null(&self, ctx: &dyn TypeContext) -> Type {
        let base = ctx.base();
        match self {
            Type::Class(c) if c.decl == base.null => Type::Nothing,
            Type::Union(u) => {
                let left = u.left.non_null(ctx);
                let right = u.right.non_null(ctx);
                Type::union(left, right, ctx).with_added_constraints(&u.constraints)
            }
            Type::Alias(_) if self.mentions_null(ctx) => self.unaliased(ctx).non_null(ctx),
            _ => self.clone(),
        }
    }

    fn mentions_null(&self, ctx: &dyn TypeContext) -> bool {
        match self {
            Type::Class(c) => c.decl == ctx.base().null,
            Type::Union(u) => u.left.mentions_null(ctx) || u.right.mentions_null(ctx),
            Type::Alias(_) => self.unaliased(ctx).mentions_null(ctx),
            _ => false,
        }
    }

    /// Type of the object produced by amending a value of this type
    /// (`(parent) { ... }`). `Nothing` when such a value cannot be amended.
    pub fn amended(&self, ctx: &dyn TypeContext) -> Type {
        match self {
            Type::Unknown | Type::Variable(_) => Type::Unknown,
            Type::Class(c) if is_object_class(c.decl, ctx) => self.clone(),
            Type::Module(_) => self.clone(),
            Type::Alias(_) => self.unaliased(ctx).amended(ctx),
            Type::Union(u) => Type::union(u.left.amended(ctx), u.right.amended(ctx), ctx),
            _ => Type::Nothing,
        }
    }

    /// Type produced by `new T { ... }`. Only concrete object classes can be
    /// instantiated; constraints of `T` are dropped.
    pub fn instantiated(&self, ctx: &dyn TypeContext) -> Type {
        match self {
            Type::Unknown => Type::Unknown,
            Type::Class(c) if is_object_class(c.decl, ctx) && !is_abstract(c.decl, ctx) => {
                self.without_constraints()
            }
            Type::Alias(_) => self.unaliased(ctx).instantiated(ctx),
            _ => Type::Nothing,
        }
    }

    /// Type of an object body written where a value of this type is
    /// expected, e.g. `foo { ... }` or `new { ... }`. Mixins contribute the
    /// type they amend.
    pub fn amending(&self, ctx: &dyn TypeContext) -> Type {
        let base = ctx.base();
        match self {
            Type::Unknown | Type::Variable(_) => Type::Unknown,
            Type::Class(c) if is_object_class(c.decl, ctx) => self.clone(),
            Type::Class(c) if c.decl == base.functions[1] => match c.type_args.first() {
                Some(param) => param.amending(ctx),
                None => Type::Unknown,
            },
            Type::Module(_) => self.clone(),
            Type::Alias(_) => self.unaliased(ctx).amending(ctx),
            Type::Union(u) => Type::union(u.left.amending(ctx), u.right.amending(ctx), ctx),
            _ => Type::Nothing,
        }
    }

    /// Substitute bound type variables. A substituted variable keeps its own
    /// constraints, appended after the bound type's.
    pub fn bind(&self, bindings: &TypeParameterBindings) -> Type {
        if bindings.is_empty() {
            return self.clone();
        }
        match self {
            Type::Variable(v) => match bindings.get(&v.param) {
                Some(bound) => bound.with_added_constraints(&v.constraints),
                None => self.clone(),
            },
            Type::Class(c) if !c.type_args.is_empty() => Type::Class(ClassType {
                decl: c.decl,
                type_args: bind_all(&c.type_args, bindings),
                constraints: c.constraints.clone(),
            }),
            Type::Alias(a) if !a.type_args.is_empty() => Type::Alias(AliasType {
                decl: a.decl,
                type_args: bind_all(&a.type_args, bindings),
                constraints: a.constraints.clone(),
            }),
            Type::Union(u) => Type::Union(UnionType {
                left: u.left.bind(bindings).into(),
                right: u.right.bind(bindings).into(),
                constraints: u.constraints.clone(),
            }),
            _ => self.clone(),
        }
    }

    /// One level of alias expansion: the aliased type with the alias's type
    /// arguments substituted and its constraints appended. A cyclic alias
    /// expands to `Unknown`; anything that is not an alias is returned as is.
    pub fn unaliased(&self, ctx: &dyn TypeContext) -> Type {
        let Type::Alias(alias) = self else {
            return self.clone();
        };
        ctx.in_flight()
            .scope(InFlightKey::AliasExpansion(alias.decl), Type::Unknown, || {
                let aliased = ctx.aliased_type(alias.decl);
                let bindings =
                    TypeParameterBindings::for_declaration(alias.decl, &alias.type_args, ctx);
                aliased
                    .bind(&bindings)
                    .with_added_constraints(&alias.constraints)
            })
    }

    /// Expand aliases until the outermost type is not an alias.
    pub fn fully_unaliased(&self, ctx: &dyn TypeContext) -> Type {
        let mut current = self.clone();
        for _ in 0..MAX_MODULE_CHAIN {
            if !matches!(current, Type::Alias(_)) {
                break;
            }
            current = current.unaliased(ctx);
        }
        match current {
            Type::Alias(_) => Type::Unknown,
            other => other,
        }
    }
}

fn bind_all(args: &[Type], bindings: &TypeParameterBindings) -> std::sync::Arc<[Type]> {
    args.iter().map(|arg| arg.bind(bindings)).collect()
}

fn is_object_class(decl: NodeRef, ctx: &dyn TypeContext) -> bool {
    class_extends(decl, ctx.base().object, ctx)
}

fn is_abstract(decl: NodeRef, ctx: &dyn TypeContext) -> bool {
    with_node(ctx, decl, |_, data| data.modifiers().contains(Modifiers::ABSTRACT)).unwrap_or(false)
}
