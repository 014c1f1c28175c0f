//! Type-parameter bindings.
//!
//! A persistent map from type-parameter declaration to the type bound to
//! it. Bindings are never mutated in place: `with`/`extended` return a new
//! map and leave the receiver untouched, so a map handed to one
//! computation cannot be changed by another.

use std::sync::Arc;

use pkl_syntax::NodeRef;
use rustc_hash::FxHashMap;

use crate::context::{TypeContext, type_params_of};
use crate::types::Type;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TypeParameterBindings {
    map: Arc<FxHashMap<NodeRef, Type>>,
}

impl TypeParameterBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the declared type parameters of `decl` (class, alias or method)
    /// positionally to `args`. Missing arguments are left unbound.
    pub fn for_declaration(decl: NodeRef, args: &[Type], ctx: &dyn TypeContext) -> Self {
        let params = type_params_of(ctx, decl);
        Self::new().extended(
            params
                .iter()
                .zip(args)
                .map(|(&(param, _), arg)| (param, arg.clone())),
        )
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn get(&self, param: &NodeRef) -> Option<&Type> {
        self.map.get(param)
    }

    pub fn with(&self, param: NodeRef, ty: Type) -> Self {
        self.extended(std::iter::once((param, ty)))
    }

    pub fn extended(&self, entries: impl IntoIterator<Item = (NodeRef, Type)>) -> Self {
        let mut entries = entries.into_iter().peekable();
        if entries.peek().is_none() {
            return self.clone();
        }
        let mut map = (*self.map).clone();
        map.extend(entries);
        Self { map: Arc::new(map) }
    }

    /// Bindings of `self` with every bound type itself bound through
    /// `outer`, plus the entries of `outer` not shadowed here.
    pub fn compose(&self, outer: &TypeParameterBindings) -> Self {
        if outer.is_empty() {
            return self.clone();
        }
        let mut map: FxHashMap<NodeRef, Type> = (*outer.map).clone();
        for (param, ty) in self.map.iter() {
            map.insert(*param, ty.bind(outer));
        }
        Self { map: Arc::new(map) }
    }
}
