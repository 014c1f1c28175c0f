//! Resolution walkers.
//!
//! Every name lookup (go-to-definition, typing an access expression,
//! completion, the unresolved-reference analyzer) is one walk over candidate
//! declarations, reported to a `ResolveVisitor` until it asks to stop.
//!
//! Unqualified lookups walk outward from the access site:
//! `let` bindings, lambda parameters and `for` variables, enclosing method
//! parameters and type parameters, object-body members (innermost first; the
//! innermost body also offers the members of its `this` type), enclosing
//! class members with supertypes, the module and its supermodules, imports,
//! and finally `pkl:base`.
//!
//! Qualified lookups visit the members of a receiver type.

use pkl_common::limits::{MAX_MODULE_CHAIN, MAX_SUPERTYPE_CHAIN};
use pkl_solver::{ClassType, Type, TypeContext, TypeParameterBindings, supertype_of};
use pkl_syntax::{ModuleId, Modifiers, NodeData, NodeIndex, NodeRef, SyntaxTree};
use rustc_hash::FxHashSet;

use crate::context::CheckerContext;

/// Which declarations a lookup is interested in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResolveMode {
    /// Properties, parameters and imports.
    Property,
    Method,
    /// Classes, type aliases, type parameters and imports.
    Type,
}

impl ResolveMode {
    /// Mode of an access expression: a call resolves methods.
    pub fn for_access<T: ?Sized>(args: Option<&T>) -> Self {
        if args.is_some() {
            ResolveMode::Method
        } else {
            ResolveMode::Property
        }
    }

    pub fn accepts(self, data: &NodeData) -> bool {
        match self {
            ResolveMode::Property => matches!(
                data,
                NodeData::Property { .. } | NodeData::Parameter { .. } | NodeData::Import { .. }
            ),
            ResolveMode::Method => matches!(data, NodeData::Method { .. }),
            ResolveMode::Type => matches!(
                data,
                NodeData::Class { .. }
                    | NodeData::TypeAlias { .. }
                    | NodeData::TypeParameter { .. }
                    | NodeData::Import { .. }
            ),
        }
    }
}

/// Receives candidate declarations from a walk.
pub trait ResolveVisitor {
    /// When set, candidates with any other name are skipped without calling
    /// `visit`.
    fn exact_name(&self) -> Option<&str>;

    /// Offer one candidate. `bindings` bind the type parameters of the
    /// class the candidate was found in. Return `true` to keep walking.
    fn visit(
        &mut self,
        name: &str,
        candidate: NodeRef,
        bindings: &TypeParameterBindings,
        ctx: &CheckerContext<'_>,
    ) -> bool;
}

/// Walk the scopes visible at `site`. Returns `false` if the visitor stopped
/// the walk.
pub fn resolve_unqualified_access(
    site: NodeRef,
    this_type: &Type,
    mode: ResolveMode,
    ctx: &CheckerContext<'_>,
    visitor: &mut dyn ResolveVisitor,
) -> bool {
    let Some(tree) = ctx.tree(site.module) else {
        return true;
    };
    let mut walk = Walk {
        ctx,
        mode,
        visitor,
    };
    let empty = TypeParameterBindings::new();
    let mut innermost_body = true;
    let mut prev = site.node;

    for ancestor in tree.ancestors(site.node) {
        let Some(data) = tree.data(ancestor) else {
            break;
        };
        let keep_going = match data {
            NodeData::Let { param, body, .. } if *body == prev => {
                walk.offer(&tree, *param, &empty)
            }
            NodeData::Lambda { params, body } if *body == prev => {
                walk.offer_all(&tree, params, &empty, false)
            }
            NodeData::ForGenerator {
                key, value, body, ..
            } if *body == prev => {
                key.is_none_or(|key| walk.offer(&tree, key, &empty))
                    && walk.offer(&tree, *value, &empty)
            }
            NodeData::Method {
                type_params,
                params,
                ..
            } => {
                walk.offer_all(&tree, params, &empty, false)
                    && walk.offer_all(&tree, type_params, &empty, false)
            }
            NodeData::ObjectBody { params, members } => {
                let mut keep_going = walk.offer_all(&tree, params, &empty, false)
                    && walk.offer_all(&tree, members, &empty, false);
                if keep_going && innermost_body {
                    keep_going = walk.type_members(this_type, true);
                }
                innermost_body = false;
                keep_going
            }
            NodeData::Class { type_params, .. } => {
                let class = site.with_node(ancestor);
                let own = ClassType {
                    decl: class,
                    type_args: type_params
                        .iter()
                        .map(|&param| Type::variable(site.with_node(param)))
                        .collect(),
                    constraints: Default::default(),
                };
                walk.class_members(&own, false) && walk.offer_all(&tree, type_params, &empty, false)
            }
            NodeData::TypeAlias { type_params, .. } => {
                walk.offer_all(&tree, type_params, &empty, false)
            }
            // Inside a constraint, `this` is the constrained value.
            NodeData::ConstrainedType { constraints, .. } if constraints.contains(&prev) => {
                walk.type_members(this_type, true)
            }
            NodeData::Module { .. } => break,
            _ => true,
        };
        if !keep_going {
            return false;
        }
        prev = ancestor;
    }

    walk.module_members(site.module, false)
        && walk.offer_all(&tree, tree.imports(), &empty, false)
        && (site.module == ModuleId::BASE || walk.module_members(ModuleId::BASE, true))
}

/// Walk the members of `receiver`. Returns `false` if the visitor stopped
/// the walk.
pub fn resolve_qualified_access(
    receiver: &Type,
    mode: ResolveMode,
    ctx: &CheckerContext<'_>,
    visitor: &mut dyn ResolveVisitor,
) -> bool {
    let mut walk = Walk {
        ctx,
        mode,
        visitor,
    };
    walk.type_members(receiver, true)
}

struct Walk<'w, 'c, 'a> {
    ctx: &'c CheckerContext<'a>,
    mode: ResolveMode,
    visitor: &'w mut dyn ResolveVisitor,
}

impl Walk<'_, '_, '_> {
    fn offer(&mut self, tree: &SyntaxTree, idx: NodeIndex, bindings: &TypeParameterBindings) -> bool {
        let Some(data) = tree.data(idx) else {
            return true;
        };
        if !self.mode.accepts(data) {
            return true;
        }
        let Some(name) = data.name() else {
            return true;
        };
        if self.visitor.exact_name().is_some_and(|exact| exact != name) {
            return true;
        }
        self.visitor.visit(name, tree.node_ref(idx), bindings, self.ctx)
    }

    fn offer_all(
        &mut self,
        tree: &SyntaxTree,
        members: &[NodeIndex],
        bindings: &TypeParameterBindings,
        skip_local: bool,
    ) -> bool {
        for &member in members {
            if skip_local && tree.modifiers(member).contains(Modifiers::LOCAL) {
                continue;
            }
            if !self.offer(tree, member, bindings) {
                return false;
            }
        }
        true
    }

    fn type_members(&mut self, ty: &Type, skip_local: bool) -> bool {
        let base = self.ctx.base();
        match ty.fully_unaliased(self.ctx) {
            Type::Unknown | Type::Nothing | Type::Alias(_) => true,
            Type::Class(class) => self.class_members(&class, skip_local),
            Type::Module(module) => {
                self.module_members(module.module, skip_local)
                    && self.type_members(&base.module_class_type(), true)
            }
            Type::StringLiteral(_) => self.type_members(&base.string_type(), true),
            Type::Variable(_) => self.type_members(&base.any_type(), true),
            Type::Union(union) => {
                self.type_members(&union.left, skip_local)
                    && self.type_members(&union.right, skip_local)
            }
        }
    }

    /// Members of `class` and its supertypes. Locals of supertypes are
    /// never visible; locals of `class` itself only when `skip_local` is
    /// false.
    fn class_members(&mut self, class: &ClassType, skip_local: bool) -> bool {
        let mut current = Some(class.clone());
        let mut seen = FxHashSet::default();
        let mut first = true;
        for _ in 0..MAX_SUPERTYPE_CHAIN {
            let Some(class) = current.take() else {
                break;
            };
            if !seen.insert(class.decl) {
                break;
            }
            let Some(tree) = self.ctx.tree(class.decl.module) else {
                break;
            };
            let bindings =
                TypeParameterBindings::for_declaration(class.decl, &class.type_args, self.ctx);
            let members = tree.members_of(class.decl.node);
            if !self.offer_all(&tree, members, &bindings, skip_local || !first) {
                return false;
            }
            first = false;
            current = supertype_of(&class, self.ctx);
        }
        true
    }

    /// Members of `module` and its supermodule chain.
    fn module_members(&mut self, module: ModuleId, skip_local: bool) -> bool {
        let empty = TypeParameterBindings::new();
        let chain = self.ctx.module_chain(module);
        for (i, &current) in chain.iter().take(MAX_MODULE_CHAIN as usize).enumerate() {
            let Some(tree) = self.ctx.tree(current) else {
                continue;
            };
            if !self.offer_all(&tree, tree.module_members(), &empty, skip_local || i > 0) {
                return false;
            }
        }
        true
    }
}
