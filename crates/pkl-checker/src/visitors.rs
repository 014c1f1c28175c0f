//! Resolution visitors built on `ResolveVisitor`.

use pkl_solver::{Type, TypeParameterBindings};
use pkl_syntax::{ModuleId, NodeData, NodeIndex, NodeRef};
use rustc_hash::FxHashSet;

use crate::context::CheckerContext;
use crate::flow::FlowFacts;
use crate::resolve::ResolveVisitor;

/// A resolved declaration with the bindings of the class it was found in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub decl: NodeRef,
    pub bindings: TypeParameterBindings,
}

// =============================================================================
// First match
// =============================================================================

/// Stops at the first declaration named `name`.
///
/// An import resolves to the root of the imported module (or stays the
/// import node when the module is not available). A type parameter that is
/// bound to a class or alias resolves to that declaration.
pub struct FirstMatch<'n> {
    name: &'n str,
    found: Option<Resolved>,
}

impl<'n> FirstMatch<'n> {
    pub fn new(name: &'n str) -> Self {
        Self { name, found: None }
    }

    pub fn into_result(self) -> Option<Resolved> {
        self.found
    }
}

impl ResolveVisitor for FirstMatch<'_> {
    fn exact_name(&self) -> Option<&str> {
        Some(self.name)
    }

    fn visit(
        &mut self,
        name: &str,
        candidate: NodeRef,
        bindings: &TypeParameterBindings,
        ctx: &CheckerContext<'_>,
    ) -> bool {
        if name != self.name {
            return true;
        }
        let decl = if ctx.node_matches(candidate, |data| matches!(data, NodeData::Import { .. })) {
            ctx.imported_module(candidate)
                .and_then(|module| ctx.module_root(module))
                .unwrap_or(candidate)
        } else {
            match bindings.get(&candidate) {
                Some(Type::Class(class)) => class.decl,
                Some(Type::Alias(alias)) => alias.decl,
                _ => candidate,
            }
        };
        self.found = Some(Resolved {
            decl,
            bindings: bindings.clone(),
        });
        false
    }
}

// =============================================================================
// Typed first match
// =============================================================================

/// Arguments of the call being resolved, used to infer method type
/// parameters.
#[derive(Copy, Clone, Debug)]
pub struct CallSite<'n> {
    pub module: ModuleId,
    pub args: &'n [NodeIndex],
}

/// Stops at the first declaration named `name` and computes its type,
/// narrowed by flow facts and made nullable for `?.` access.
pub struct TypeOfFirstMatch<'n> {
    name: &'n str,
    facts: FlowFacts,
    call: Option<CallSite<'n>>,
    null_safe: bool,
    found: Option<(NodeRef, Type)>,
}

impl<'n> TypeOfFirstMatch<'n> {
    pub fn new(name: &'n str) -> Self {
        Self {
            name,
            facts: FlowFacts::default(),
            call: None,
            null_safe: false,
            found: None,
        }
    }

    pub fn with_facts(mut self, facts: FlowFacts) -> Self {
        self.facts = facts;
        self
    }

    pub fn with_call(mut self, call: Option<CallSite<'n>>) -> Self {
        self.call = call;
        self
    }

    pub fn null_safe(mut self, null_safe: bool) -> Self {
        self.null_safe = null_safe;
        self
    }

    pub fn declaration(&self) -> Option<NodeRef> {
        self.found.as_ref().map(|(decl, _)| *decl)
    }

    pub fn into_type(self) -> Option<Type> {
        self.found.map(|(_, ty)| ty)
    }
}

impl ResolveVisitor for TypeOfFirstMatch<'_> {
    fn exact_name(&self) -> Option<&str> {
        Some(self.name)
    }

    fn visit(
        &mut self,
        name: &str,
        candidate: NodeRef,
        bindings: &TypeParameterBindings,
        ctx: &CheckerContext<'_>,
    ) -> bool {
        if name != self.name {
            return true;
        }
        let mut ty = match self.call {
            Some(call) if ctx.node_matches(candidate, |data| matches!(data, NodeData::Method { .. })) => {
                let bindings = ctx.call_bindings(candidate, bindings, call);
                ctx.method_return_type(candidate, &bindings)
            }
            _ => ctx.type_of_declaration(candidate, bindings),
        };
        ty = self.facts.narrow(candidate, ty, ctx);
        if self.null_safe {
            ty = ty.nullable(ctx);
        }
        self.found = Some((candidate, ty));
        false
    }
}

// =============================================================================
// Shadow suppression
// =============================================================================

/// Forwards each name to the inner visitor at most once per kind (method
/// or non-method). The walk visits inner scopes first, so the declaration
/// that wins is the closest one.
pub struct ShadowSuppressing<V> {
    inner: V,
    methods: FxHashSet<String>,
    others: FxHashSet<String>,
}

impl<V: ResolveVisitor> ShadowSuppressing<V> {
    pub fn new(inner: V) -> Self {
        Self {
            inner,
            methods: FxHashSet::default(),
            others: FxHashSet::default(),
        }
    }

    pub fn inner(&self) -> &V {
        &self.inner
    }

    pub fn into_inner(self) -> V {
        self.inner
    }
}

impl<V: ResolveVisitor> ResolveVisitor for ShadowSuppressing<V> {
    fn exact_name(&self) -> Option<&str> {
        self.inner.exact_name()
    }

    fn visit(
        &mut self,
        name: &str,
        candidate: NodeRef,
        bindings: &TypeParameterBindings,
        ctx: &CheckerContext<'_>,
    ) -> bool {
        let is_method = ctx.node_matches(candidate, |data| matches!(data, NodeData::Method { .. }));
        let seen = if is_method {
            &mut self.methods
        } else {
            &mut self.others
        };
        if !seen.insert(name.to_string()) {
            return true;
        }
        self.inner.visit(name, candidate, bindings, ctx)
    }
}
