//! Types denoted by type annotations.

use pkl_solver::{Constraints, Type, TypeContext, TypeParameterBindings};
use pkl_syntax::{NodeData, NodeRef};

use crate::context::CheckerContext;
use crate::resolve::{ResolveMode, resolve_qualified_access, resolve_unqualified_access};
use crate::visitors::{FirstMatch, Resolved};

impl<'a> CheckerContext<'a> {
    /// The type a type node denotes. Type parameters bound in `bindings` are
    /// substituted; unbound ones stay `Type::Variable`s.
    pub fn type_of_type_node(&self, node: NodeRef, bindings: &TypeParameterBindings) -> Type {
        let Some(tree) = self.tree(node.module) else {
            return Type::Unknown;
        };
        let Some(data) = tree.data(node.node) else {
            return Type::Unknown;
        };
        match data {
            NodeData::DeclaredType {
                qualifier,
                name,
                type_args,
            } => {
                let resolved = match qualifier {
                    Some(qualifier) => self.resolve_qualified_type(node, qualifier, name),
                    None => self.resolve_type_name(node, name),
                };
                let Some(resolved) = resolved else {
                    return Type::Unknown;
                };
                let args = type_args
                    .iter()
                    .map(|&arg| self.type_of_type_node(node.with_node(arg), bindings))
                    .collect();
                self.type_of_type_declaration(resolved.decl, args, bindings)
            }
            NodeData::StringLiteralType { value } => Type::string_literal(value),
            NodeData::NullableType { inner } => self
                .type_of_type_node(node.with_node(*inner), bindings)
                .nullable(self),
            NodeData::UnionType { left, right } => {
                let left = self.type_of_type_node(node.with_node(*left), bindings);
                let right = self.type_of_type_node(node.with_node(*right), bindings);
                Type::union(left, right, self)
            }
            NodeData::ConstrainedType { inner, constraints } => {
                let refs = constraints.iter().map(|&c| node.with_node(c)).collect();
                self.type_of_type_node(node.with_node(*inner), bindings)
                    .with_added_constraints(&Constraints::new(refs))
            }
            NodeData::FunctionType { params, ret } => {
                let params = params
                    .iter()
                    .map(|&p| self.type_of_type_node(node.with_node(p), bindings))
                    .collect();
                let ret = self.type_of_type_node(node.with_node(*ret), bindings);
                self.base().function_type(params, ret)
            }
            NodeData::ParenthesizedType { inner } => {
                self.type_of_type_node(node.with_node(*inner), bindings)
            }
            NodeData::UnknownType => Type::Unknown,
            NodeData::NothingType => Type::Nothing,
            NodeData::ModuleType => Type::module(node.module, None, self),
            _ => Type::Unknown,
        }
    }

    /// Type named by a resolved type declaration applied to `args`.
    fn type_of_type_declaration(
        &self,
        decl: NodeRef,
        args: Vec<Type>,
        bindings: &TypeParameterBindings,
    ) -> Type {
        let Some(tree) = self.tree(decl.module) else {
            return Type::Unknown;
        };
        match tree.data(decl.node) {
            Some(NodeData::Class { .. }) => Type::class(decl, args, self),
            Some(NodeData::TypeAlias { .. }) => Type::alias(decl, args, self),
            Some(NodeData::TypeParameter { .. }) => bindings
                .get(&decl)
                .cloned()
                .unwrap_or_else(|| Type::variable(decl)),
            Some(NodeData::Module { name, .. }) => {
                Type::module(decl.module, name.as_deref(), self)
            }
            _ => Type::Unknown,
        }
    }

    /// Resolve an unqualified type name visible at `site`.
    pub fn resolve_type_name(&self, site: NodeRef, name: &str) -> Option<Resolved> {
        let mut visitor = FirstMatch::new(name);
        resolve_unqualified_access(site, &Type::Unknown, ResolveMode::Type, self, &mut visitor);
        visitor.into_result()
    }

    /// Resolve `qualifier.Name`, where `qualifier` names an import.
    pub fn resolve_qualified_type(&self, site: NodeRef, qualifier: &str, name: &str) -> Option<Resolved> {
        let module = self.resolve_type_name(site, qualifier)?;
        if !self.node_matches(module.decl, |data| matches!(data, NodeData::Module { .. })) {
            return None;
        }
        let module_type = Type::module(module.decl.module, Some(qualifier), self);
        let mut visitor = FirstMatch::new(name);
        resolve_qualified_access(&module_type, ResolveMode::Type, self, &mut visitor);
        visitor.into_result()
    }
}
