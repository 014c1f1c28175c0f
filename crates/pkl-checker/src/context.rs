//! Per-request checker state.
//!
//! A `CheckerContext` is created for one analysis request (diagnostics for a
//! module, one completion, one hover) and dropped afterwards. It owns the
//! request's `InFlight` recursion guard and a handful of memo tables, so it
//! is deliberately `!Sync`: parallel requests each build their own context
//! over the same shared, immutable trees.

use std::cell::RefCell;
use std::hash::Hash;
use std::sync::Arc;

use pkl_solver::{Base, InFlight, InFlightKey, Type, TypeContext, TypeParameterBindings};
use pkl_syntax::{ModuleId, NodeData, NodeRef, SyntaxTree};
use rustc_hash::FxHashMap;

/// Source of syntax trees and module references.
///
/// Implemented by the language server's workspace; tests implement it over
/// a vector of hand-built trees.
pub trait ModuleProvider: Sync {
    /// Tree of an open module. The base module is supplied by `Base` and is
    /// never requested here.
    fn module_tree(&self, module: ModuleId) -> Option<Arc<SyntaxTree>>;

    /// Resolve a module reference written in `from` (an import URI or an
    /// `amends`/`extends` target).
    fn resolve_module(&self, from: ModuleId, uri: &str) -> Option<ModuleId>;
}

pub struct CheckerContext<'a> {
    provider: &'a dyn ModuleProvider,
    base: &'a Base,
    in_flight: InFlight,
    trees: RefCell<FxHashMap<ModuleId, Option<Arc<SyntaxTree>>>>,
    modules: RefCell<FxHashMap<(ModuleId, String), Option<ModuleId>>>,
    supertypes: RefCell<FxHashMap<NodeRef, Option<Type>>>,
    aliased: RefCell<FxHashMap<NodeRef, Type>>,
    pub(crate) member_types: RefCell<FxHashMap<NodeRef, Type>>,
}

impl<'a> CheckerContext<'a> {
    pub fn new(provider: &'a dyn ModuleProvider, base: &'a Base) -> Self {
        Self {
            provider,
            base,
            in_flight: InFlight::new(),
            trees: RefCell::new(FxHashMap::default()),
            modules: RefCell::new(FxHashMap::default()),
            supertypes: RefCell::new(FxHashMap::default()),
            aliased: RefCell::new(FxHashMap::default()),
            member_types: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn provider(&self) -> &'a dyn ModuleProvider {
        self.provider
    }

    /// Modules whose trees this context has requested so far, including
    /// ones the provider did not have. The base module is not listed.
    pub fn loaded_modules(&self) -> Vec<ModuleId> {
        let mut loaded: Vec<ModuleId> = self.trees.borrow().keys().copied().collect();
        loaded.sort_unstable();
        loaded
    }

    /// Data of `node`, cloned out of its tree.
    pub fn node_data(&self, node: NodeRef) -> Option<NodeData> {
        self.tree(node.module)?.data(node.node).cloned()
    }

    /// Whether the data of `node` satisfies `pred`, without cloning it.
    pub fn node_matches(&self, node: NodeRef, pred: impl FnOnce(&NodeData) -> bool) -> bool {
        self.tree(node.module)
            .is_some_and(|tree| tree.data(node.node).is_some_and(pred))
    }

    pub fn node_name(&self, node: NodeRef) -> Option<String> {
        self.tree(node.module)?.name(node.node).map(str::to_string)
    }

    pub fn parent(&self, node: NodeRef) -> Option<NodeRef> {
        let parent = self.tree(node.module)?.parent(node.node)?;
        Some(node.with_node(parent))
    }

    /// Root node of a module.
    pub fn module_root(&self, module: ModuleId) -> Option<NodeRef> {
        let tree = self.tree(module)?;
        Some(tree.node_ref(tree.root()))
    }

    /// Resolve a module reference written in `from`. Memoized per request.
    pub fn resolve_module(&self, from: ModuleId, uri: &str) -> Option<ModuleId> {
        if uri == pkl_syntax::stdlib::BASE_MODULE_URI {
            return Some(ModuleId::BASE);
        }
        let key = (from, uri.to_string());
        if let Some(resolved) = self.modules.borrow().get(&key) {
            return *resolved;
        }
        let resolved = self.provider.resolve_module(from, uri);
        self.modules.borrow_mut().insert(key, resolved);
        resolved
    }

    /// Module an `import` node refers to.
    pub fn imported_module(&self, import: NodeRef) -> Option<ModuleId> {
        match self.node_data(import)? {
            NodeData::Import { uri, .. } => self.resolve_module(import.module, &uri),
            _ => None,
        }
    }

    /// `module` followed by its `amends`/`extends` chain, without repeats.
    pub fn module_chain(&self, module: ModuleId) -> Vec<ModuleId> {
        let mut chain = vec![module];
        let mut current = module;
        for _ in 0..pkl_common::limits::MAX_MODULE_CHAIN {
            match self.supermodule(current) {
                Some(next) if !chain.contains(&next) => {
                    chain.push(next);
                    current = next;
                }
                _ => break,
            }
        }
        chain
    }

    /// Look `key` up in `cache`, computing and storing it on a miss. Results
    /// computed while a recursion guard refused entry are returned but not
    /// stored: they may contain a cycle fallback that depends on where the
    /// computation started.
    pub(crate) fn memoized<K, V>(
        &self,
        cache: &RefCell<FxHashMap<K, V>>,
        key: K,
        compute: impl FnOnce() -> V,
    ) -> V
    where
        K: Hash + Eq,
        V: Clone,
    {
        if let Some(hit) = cache.borrow().get(&key) {
            return hit.clone();
        }
        let before = self.in_flight.fallback_count();
        let value = compute();
        if self.in_flight.fallback_count() == before {
            cache.borrow_mut().insert(key, value.clone());
        }
        value
    }

    fn class_supertype(&self, class: NodeRef) -> Option<Type> {
        if class == self.base.any {
            return None;
        }
        let extends = match self.node_data(class)? {
            NodeData::Class { extends, .. } => extends,
            _ => return None,
        };
        let Some(extends) = extends else {
            return Some(self.base.typed_type());
        };
        self.in_flight.scope(InFlightKey::Supertype(class), None, || {
            Some(self.type_of_type_node(class.with_node(extends), &TypeParameterBindings::new()))
        })
    }

    fn alias_target(&self, alias: NodeRef) -> Type {
        match self.node_data(alias) {
            Some(NodeData::TypeAlias { aliased, .. }) => {
                self.type_of_type_node(alias.with_node(aliased), &TypeParameterBindings::new())
            }
            _ => Type::Unknown,
        }
    }
}

impl TypeContext for CheckerContext<'_> {
    fn base(&self) -> &Base {
        self.base
    }

    fn tree(&self, module: ModuleId) -> Option<Arc<SyntaxTree>> {
        if module == ModuleId::BASE {
            return Some(self.base.tree().clone());
        }
        if let Some(tree) = self.trees.borrow().get(&module) {
            return tree.clone();
        }
        let tree = self.provider.module_tree(module);
        self.trees.borrow_mut().insert(module, tree.clone());
        tree
    }

    fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    fn supertype(&self, class: NodeRef) -> Option<Type> {
        self.memoized(&self.supertypes, class, || self.class_supertype(class))
    }

    fn aliased_type(&self, alias: NodeRef) -> Type {
        self.memoized(&self.aliased, alias, || self.alias_target(alias))
    }

    fn supermodule(&self, module: ModuleId) -> Option<ModuleId> {
        let tree = self.tree(module)?;
        let clause = tree.module_clause()?;
        self.resolve_module(module, &clause.uri)
            .filter(|&target| target != module)
    }
}
