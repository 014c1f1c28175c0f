//! Programmatic tree construction.
//!
//! `TreeBuilder` is the write side of `SyntaxTree`. A parser pushes nodes
//! with their real spans through [`TreeBuilder::push`]; tests and the bundled
//! standard library use the convenience constructors, which assign each node
//! a synthetic one-byte span at a monotonically increasing offset.
//!
//! `finish` fills in parent links and widens every node's span to cover its
//! children, so offset lookups work on synthetic trees too.

use pkl_common::Span;

use crate::node::{
    BinaryOp, Modifier, ModifierToken, ModuleClause, ModuleClauseKind, ModuleId, Node, NodeData,
    NodeIndex, UnaryOp, Variance,
};
use crate::tree::SyntaxTree;

pub struct TreeBuilder {
    uri: String,
    module: ModuleId,
    nodes: Vec<Node>,
    cursor: u32,
}

impl TreeBuilder {
    pub fn new(uri: impl Into<String>, module: ModuleId) -> Self {
        Self {
            uri: uri.into(),
            module,
            nodes: Vec::new(),
            cursor: 0,
        }
    }

    pub fn module_id(&self) -> ModuleId {
        self.module
    }

    /// Add a node with an explicit source span.
    pub fn push(&mut self, data: NodeData, span: Span) -> NodeIndex {
        let idx = NodeIndex(self.nodes.len() as u32);
        self.cursor = self.cursor.max(span.end);
        self.nodes.push(Node {
            data,
            span,
            parent: NodeIndex::NONE,
        });
        idx
    }

    /// Add a node with a synthetic span.
    pub fn add(&mut self, data: NodeData) -> NodeIndex {
        let span = self.next_span();
        self.push(data, span)
    }

    fn next_span(&mut self) -> Span {
        let span = Span::new(self.cursor, self.cursor + 1);
        self.cursor += 1;
        span
    }

    /// Seal the tree. `root` must be a `NodeData::Module`.
    pub fn finish(mut self, root: NodeIndex) -> SyntaxTree {
        for i in 0..self.nodes.len() {
            let parent = NodeIndex(i as u32);
            let mut span = self.nodes[i].span;
            for token in self.nodes[i].data.modifier_tokens() {
                span = span.cover(token.span);
            }
            for child in self.nodes[i].data.children() {
                let Some(child_node) = self.nodes.get_mut(child.0 as usize) else {
                    tracing::warn!(uri = %self.uri, child = child.0, "dangling child index");
                    continue;
                };
                child_node.parent = parent;
                if !child_node.span.is_empty() {
                    span = span.cover(child_node.span);
                }
            }
            self.nodes[i].span = span;
        }
        SyntaxTree::from_parts(self.uri, self.module, self.nodes, root)
    }

    fn modifier_tokens(&mut self, modifiers: &[Modifier]) -> Vec<ModifierToken> {
        modifiers
            .iter()
            .map(|&modifier| ModifierToken {
                modifier,
                span: self.next_span(),
            })
            .collect()
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    pub fn module(
        &mut self,
        name: Option<&str>,
        clause: Option<(ModuleClauseKind, &str)>,
        imports: Vec<NodeIndex>,
        members: Vec<NodeIndex>,
    ) -> NodeIndex {
        self.module_with_modifiers(&[], name, clause, imports, members)
    }

    pub fn module_with_modifiers(
        &mut self,
        modifiers: &[Modifier],
        name: Option<&str>,
        clause: Option<(ModuleClauseKind, &str)>,
        imports: Vec<NodeIndex>,
        members: Vec<NodeIndex>,
    ) -> NodeIndex {
        let modifiers = self.modifier_tokens(modifiers);
        let clause = clause.map(|(kind, uri)| ModuleClause {
            kind,
            uri: uri.to_string(),
            span: self.next_span(),
        });
        self.add(NodeData::Module {
            name: name.map(str::to_string),
            modifiers,
            clause,
            imports,
            members,
        })
    }

    pub fn import(&mut self, uri: &str, alias: Option<&str>) -> NodeIndex {
        self.add(NodeData::Import {
            uri: uri.to_string(),
            alias: alias.map(str::to_string),
            glob: false,
        })
    }

    pub fn class(
        &mut self,
        modifiers: &[Modifier],
        name: &str,
        type_params: Vec<NodeIndex>,
        extends: Option<NodeIndex>,
        members: Vec<NodeIndex>,
    ) -> NodeIndex {
        let modifiers = self.modifier_tokens(modifiers);
        self.add(NodeData::Class {
            name: name.to_string(),
            modifiers,
            type_params,
            extends,
            members,
        })
    }

    pub fn type_alias(
        &mut self,
        modifiers: &[Modifier],
        name: &str,
        type_params: Vec<NodeIndex>,
        aliased: NodeIndex,
    ) -> NodeIndex {
        let modifiers = self.modifier_tokens(modifiers);
        self.add(NodeData::TypeAlias {
            name: name.to_string(),
            modifiers,
            type_params,
            aliased,
        })
    }

    pub fn type_param(&mut self, name: &str, variance: Variance) -> NodeIndex {
        self.add(NodeData::TypeParameter {
            name: name.to_string(),
            variance,
        })
    }

    pub fn param(&mut self, name: &str, type_annotation: Option<NodeIndex>) -> NodeIndex {
        self.add(NodeData::Parameter {
            name: name.to_string(),
            type_annotation,
        })
    }

    /// `name: Type = value`; either part may be absent.
    pub fn property(
        &mut self,
        modifiers: &[Modifier],
        name: &str,
        type_annotation: Option<NodeIndex>,
        value: Option<NodeIndex>,
    ) -> NodeIndex {
        let modifiers = self.modifier_tokens(modifiers);
        self.add(NodeData::Property {
            name: name.to_string(),
            modifiers,
            type_annotation,
            value,
            bodies: Vec::new(),
        })
    }

    /// `name { ... }`: a property amended in place by object bodies.
    pub fn object_property(
        &mut self,
        modifiers: &[Modifier],
        name: &str,
        bodies: Vec<NodeIndex>,
    ) -> NodeIndex {
        let modifiers = self.modifier_tokens(modifiers);
        self.add(NodeData::Property {
            name: name.to_string(),
            modifiers,
            type_annotation: None,
            value: None,
            bodies,
        })
    }

    pub fn method(
        &mut self,
        modifiers: &[Modifier],
        name: &str,
        type_params: Vec<NodeIndex>,
        params: Vec<NodeIndex>,
        return_type: Option<NodeIndex>,
        body: Option<NodeIndex>,
    ) -> NodeIndex {
        let modifiers = self.modifier_tokens(modifiers);
        self.add(NodeData::Method {
            name: name.to_string(),
            modifiers,
            type_params,
            params,
            return_type,
            body,
        })
    }

    // =========================================================================
    // Object bodies
    // =========================================================================

    pub fn object_body(&mut self, params: Vec<NodeIndex>, members: Vec<NodeIndex>) -> NodeIndex {
        self.add(NodeData::ObjectBody { params, members })
    }

    pub fn element(&mut self, value: NodeIndex) -> NodeIndex {
        self.add(NodeData::Element { value })
    }

    pub fn entry(&mut self, key: NodeIndex, value: NodeIndex) -> NodeIndex {
        self.add(NodeData::Entry {
            key,
            value: Some(value),
            bodies: Vec::new(),
        })
    }

    pub fn entry_amending(&mut self, key: NodeIndex, bodies: Vec<NodeIndex>) -> NodeIndex {
        self.add(NodeData::Entry {
            key,
            value: None,
            bodies,
        })
    }

    pub fn for_generator(
        &mut self,
        key: Option<NodeIndex>,
        value: NodeIndex,
        iterable: NodeIndex,
        body: NodeIndex,
    ) -> NodeIndex {
        self.add(NodeData::ForGenerator {
            key,
            value,
            iterable,
            body,
        })
    }

    pub fn when_generator(
        &mut self,
        condition: NodeIndex,
        body: NodeIndex,
        else_body: Option<NodeIndex>,
    ) -> NodeIndex {
        self.add(NodeData::WhenGenerator {
            condition,
            body,
            else_body,
        })
    }

    pub fn spread(&mut self, expr: NodeIndex, null_safe: bool) -> NodeIndex {
        self.add(NodeData::Spread { expr, null_safe })
    }

    // =========================================================================
    // Types
    // =========================================================================

    pub fn declared_type(&mut self, name: &str, type_args: Vec<NodeIndex>) -> NodeIndex {
        self.add(NodeData::DeclaredType {
            qualifier: None,
            name: name.to_string(),
            type_args,
        })
    }

    pub fn qualified_type(
        &mut self,
        qualifier: &str,
        name: &str,
        type_args: Vec<NodeIndex>,
    ) -> NodeIndex {
        self.add(NodeData::DeclaredType {
            qualifier: Some(qualifier.to_string()),
            name: name.to_string(),
            type_args,
        })
    }

    pub fn string_literal_type(&mut self, value: &str) -> NodeIndex {
        self.add(NodeData::StringLiteralType {
            value: value.to_string(),
        })
    }

    pub fn nullable_type(&mut self, inner: NodeIndex) -> NodeIndex {
        self.add(NodeData::NullableType { inner })
    }

    pub fn union_type(&mut self, left: NodeIndex, right: NodeIndex) -> NodeIndex {
        self.add(NodeData::UnionType { left, right })
    }

    pub fn constrained_type(&mut self, inner: NodeIndex, constraints: Vec<NodeIndex>) -> NodeIndex {
        self.add(NodeData::ConstrainedType { inner, constraints })
    }

    pub fn function_type(&mut self, params: Vec<NodeIndex>, ret: NodeIndex) -> NodeIndex {
        self.add(NodeData::FunctionType { params, ret })
    }

    pub fn parenthesized_type(&mut self, inner: NodeIndex) -> NodeIndex {
        self.add(NodeData::ParenthesizedType { inner })
    }

    pub fn unknown_type(&mut self) -> NodeIndex {
        self.add(NodeData::UnknownType)
    }

    pub fn nothing_type(&mut self) -> NodeIndex {
        self.add(NodeData::NothingType)
    }

    pub fn module_type(&mut self) -> NodeIndex {
        self.add(NodeData::ModuleType)
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    pub fn string(&mut self, value: &str) -> NodeIndex {
        self.add(NodeData::StringLit(value.to_string()))
    }

    pub fn int(&mut self, value: i64) -> NodeIndex {
        self.add(NodeData::IntLit(value))
    }

    pub fn float(&mut self, value: f64) -> NodeIndex {
        self.add(NodeData::FloatLit(value))
    }

    pub fn boolean(&mut self, value: bool) -> NodeIndex {
        self.add(NodeData::BoolLit(value))
    }

    pub fn null(&mut self) -> NodeIndex {
        self.add(NodeData::NullLit)
    }

    pub fn this(&mut self) -> NodeIndex {
        self.add(NodeData::This)
    }

    pub fn outer(&mut self) -> NodeIndex {
        self.add(NodeData::Outer)
    }

    pub fn module_expr(&mut self) -> NodeIndex {
        self.add(NodeData::ModuleExpr)
    }

    pub fn ident(&mut self, name: &str) -> NodeIndex {
        self.add(NodeData::UnqualifiedAccess {
            name: name.to_string(),
            args: None,
        })
    }

    pub fn call(&mut self, name: &str, args: Vec<NodeIndex>) -> NodeIndex {
        self.add(NodeData::UnqualifiedAccess {
            name: name.to_string(),
            args: Some(args),
        })
    }

    pub fn member(&mut self, receiver: NodeIndex, name: &str) -> NodeIndex {
        self.add(NodeData::QualifiedAccess {
            receiver,
            name: name.to_string(),
            args: None,
            null_safe: false,
        })
    }

    pub fn null_safe_member(&mut self, receiver: NodeIndex, name: &str) -> NodeIndex {
        self.add(NodeData::QualifiedAccess {
            receiver,
            name: name.to_string(),
            args: None,
            null_safe: true,
        })
    }

    pub fn method_call(&mut self, receiver: NodeIndex, name: &str, args: Vec<NodeIndex>) -> NodeIndex {
        self.add(NodeData::QualifiedAccess {
            receiver,
            name: name.to_string(),
            args: Some(args),
            null_safe: false,
        })
    }

    pub fn super_member(&mut self, name: &str) -> NodeIndex {
        self.add(NodeData::SuperAccess {
            name: name.to_string(),
            args: None,
        })
    }

    pub fn binary(&mut self, op: BinaryOp, left: NodeIndex, right: NodeIndex) -> NodeIndex {
        self.add(NodeData::Binary { op, left, right })
    }

    pub fn unary(&mut self, op: UnaryOp, operand: NodeIndex) -> NodeIndex {
        self.add(NodeData::Unary { op, operand })
    }

    pub fn non_null(&mut self, operand: NodeIndex) -> NodeIndex {
        self.add(NodeData::NonNull { operand })
    }

    pub fn is_type(&mut self, operand: NodeIndex, type_node: NodeIndex) -> NodeIndex {
        self.add(NodeData::TypeTest { operand, type_node })
    }

    pub fn as_type(&mut self, operand: NodeIndex, type_node: NodeIndex) -> NodeIndex {
        self.add(NodeData::TypeCast { operand, type_node })
    }

    pub fn if_else(
        &mut self,
        condition: NodeIndex,
        then_branch: NodeIndex,
        else_branch: NodeIndex,
    ) -> NodeIndex {
        self.add(NodeData::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    /// `let (name = value) body`.
    pub fn let_in(&mut self, name: &str, value: NodeIndex, body: NodeIndex) -> NodeIndex {
        let param = self.param(name, None);
        self.add(NodeData::Let { param, value, body })
    }

    pub fn lambda(&mut self, params: Vec<NodeIndex>, body: NodeIndex) -> NodeIndex {
        self.add(NodeData::Lambda { params, body })
    }

    pub fn new_object(&mut self, type_node: Option<NodeIndex>, body: NodeIndex) -> NodeIndex {
        self.add(NodeData::New { type_node, body })
    }

    pub fn amend(&mut self, parent: NodeIndex, body: NodeIndex) -> NodeIndex {
        self.add(NodeData::Amend { parent, body })
    }

    pub fn import_expr(&mut self, uri: &str) -> NodeIndex {
        self.add(NodeData::ImportExpr {
            uri: uri.to_string(),
            glob: false,
        })
    }

    pub fn subscript(&mut self, receiver: NodeIndex, index: NodeIndex) -> NodeIndex {
        self.add(NodeData::Subscript { receiver, index })
    }

    pub fn parens(&mut self, inner: NodeIndex) -> NodeIndex {
        self.add(NodeData::Parenthesized { inner })
    }

    pub fn throw(&mut self, message: NodeIndex) -> NodeIndex {
        self.add(NodeData::Throw { message })
    }
}
