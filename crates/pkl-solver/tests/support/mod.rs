//! Shared fixture for the type-algebra tests: a `TypeContext` over the
//! bundled base module plus hand-built modules, with just enough name
//! resolution to turn type nodes into types.
#![allow(dead_code)]

use std::sync::Arc;

use pkl_solver::{Base, Constraints, InFlight, Type, TypeContext};
use pkl_syntax::stdlib::base_module_tree;
use pkl_syntax::{ModuleId, NodeData, NodeIndex, NodeRef, SyntaxTree, TreeBuilder};

pub struct Fixture {
    base: Base,
    trees: Vec<Arc<SyntaxTree>>,
    in_flight: InFlight,
}

impl Fixture {
    pub fn new() -> Self {
        let base_tree = Arc::new(base_module_tree());
        let base = Base::new(base_tree.clone()).expect("bundled base module is complete");
        Self {
            base,
            trees: vec![base_tree],
            in_flight: InFlight::new(),
        }
    }

    /// Build and register a module. `build` returns the module root.
    pub fn module(&mut self, uri: &str, build: impl FnOnce(&mut TreeBuilder) -> NodeIndex) -> ModuleId {
        let id = ModuleId(self.trees.len() as u32);
        let mut builder = TreeBuilder::new(uri, id);
        let root = build(&mut builder);
        self.trees.push(Arc::new(builder.finish(root)));
        id
    }

    /// Declaration named `name`, searched in user modules first, then base.
    pub fn decl(&self, name: &str) -> NodeRef {
        self.trees
            .iter()
            .rev()
            .find_map(|tree| tree.find_type_decl(name).map(|idx| tree.node_ref(idx)))
            .unwrap_or_else(|| panic!("no declaration named {name}"))
    }

    /// `Name<args...>`, as a class or alias depending on the declaration.
    pub fn ty(&self, name: &str, args: Vec<Type>) -> Type {
        let decl = self.decl(name);
        let tree = self.tree(decl.module).expect("tree");
        match tree.data(decl.node) {
            Some(NodeData::TypeAlias { .. }) => Type::alias(decl, args, self),
            _ => Type::class(decl, args, self),
        }
    }

    pub fn simple(&self, name: &str) -> Type {
        self.ty(name, Vec::new())
    }

    pub fn union(&self, left: Type, right: Type) -> Type {
        Type::union(left, right, self)
    }

    /// Constraint refs of every top-level `ConstrainedType` node in `module`,
    /// in arena order.
    pub fn constraint_refs(&self, module: ModuleId) -> Vec<Constraints> {
        let tree = self.tree(module).expect("tree");
        tree.indices()
            .filter_map(|idx| match tree.data(idx) {
                Some(NodeData::ConstrainedType { constraints, .. }) => Some(Constraints::new(
                    constraints.iter().map(|&c| tree.node_ref(c)).collect(),
                )),
                _ => None,
            })
            .collect()
    }

    pub fn in_flight_is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Type denoted by the type node `idx` of `tree`, with type parameters
    /// of `scope` (a class, alias or method) in scope.
    pub fn resolve_type(&self, tree: &SyntaxTree, idx: NodeIndex, scope: Option<NodeIndex>) -> Type {
        let Some(data) = tree.data(idx) else {
            return Type::Unknown;
        };
        match data {
            NodeData::DeclaredType {
                name, type_args, ..
            } => {
                if let Some(param) = scope.and_then(|s| self.type_param(tree, s, name)) {
                    return Type::variable(tree.node_ref(param));
                }
                let args = type_args
                    .iter()
                    .map(|&arg| self.resolve_type(tree, arg, scope))
                    .collect();
                let local = tree.find_type_decl(name).map(|i| tree.node_ref(i));
                let base = self.trees[0].find_type_decl(name).map(|i| self.trees[0].node_ref(i));
                match local.or(base) {
                    Some(decl) => match self.tree(decl.module).and_then(|t| t.data(decl.node).cloned()) {
                        Some(NodeData::TypeAlias { .. }) => Type::alias(decl, args, self),
                        _ => Type::class(decl, args, self),
                    },
                    None => Type::Unknown,
                }
            }
            NodeData::StringLiteralType { value } => Type::string_literal(value),
            NodeData::NullableType { inner } => self.resolve_type(tree, *inner, scope).nullable(self),
            NodeData::UnionType { left, right } => {
                let left = self.resolve_type(tree, *left, scope);
                let right = self.resolve_type(tree, *right, scope);
                Type::union(left, right, self)
            }
            NodeData::ConstrainedType { inner, constraints } => {
                let refs = constraints.iter().map(|&c| tree.node_ref(c)).collect();
                self.resolve_type(tree, *inner, scope)
                    .with_added_constraints(&Constraints::new(refs))
            }
            NodeData::FunctionType { params, ret } => {
                let params = params
                    .iter()
                    .map(|&p| self.resolve_type(tree, p, scope))
                    .collect();
                let ret = self.resolve_type(tree, *ret, scope);
                self.base.function_type(params, ret)
            }
            NodeData::ParenthesizedType { inner } => self.resolve_type(tree, *inner, scope),
            NodeData::NothingType => Type::Nothing,
            NodeData::ModuleType => Type::module(tree.module_id(), None, self),
            _ => Type::Unknown,
        }
    }

    fn type_param(&self, tree: &SyntaxTree, scope: NodeIndex, name: &str) -> Option<NodeIndex> {
        let params = match tree.data(scope)? {
            NodeData::Class { type_params, .. }
            | NodeData::TypeAlias { type_params, .. }
            | NodeData::Method { type_params, .. } => type_params,
            _ => return None,
        };
        params.iter().copied().find(|&p| tree.name(p) == Some(name))
    }
}

impl TypeContext for Fixture {
    fn base(&self) -> &Base {
        &self.base
    }

    fn tree(&self, module: ModuleId) -> Option<Arc<SyntaxTree>> {
        self.trees.get(module.0 as usize).cloned()
    }

    fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    fn supertype(&self, class: NodeRef) -> Option<Type> {
        if class == self.base.any {
            return None;
        }
        let tree = self.tree(class.module)?;
        match tree.data(class.node)? {
            NodeData::Class {
                extends: Some(extends),
                ..
            } => Some(self.resolve_type(&tree, *extends, Some(class.node))),
            NodeData::Class { extends: None, .. } => Some(self.base.typed_type()),
            _ => None,
        }
    }

    fn aliased_type(&self, alias: NodeRef) -> Type {
        let Some(tree) = self.tree(alias.module) else {
            return Type::Unknown;
        };
        match tree.data(alias.node) {
            Some(NodeData::TypeAlias { aliased, .. }) => {
                self.resolve_type(&tree, *aliased, Some(alias.node))
            }
            _ => Type::Unknown,
        }
    }

    fn supermodule(&self, module: ModuleId) -> Option<ModuleId> {
        let clause = self.tree(module)?.module_clause()?.clone();
        self.trees
            .iter()
            .find(|tree| tree.uri() == clause.uri)
            .map(|tree| tree.module_id())
    }
}
