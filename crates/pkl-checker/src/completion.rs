//! Completion candidates.
//!
//! A completion walk visits every reachable declaration instead of stopping
//! at the first. Walks run through `ShadowSuppressing`, so a name declared
//! in an inner scope hides the same name further out.

use indexmap::IndexMap;
use pkl_solver::{Type, TypeContext, TypeParameterBindings};
use pkl_syntax::{NodeData, NodeIndex, NodeRef, SyntaxTree, print_node};
use smallvec::SmallVec;

use crate::context::CheckerContext;
use crate::resolve::{
    ResolveMode, ResolveVisitor, resolve_qualified_access, resolve_unqualified_access,
};
use crate::visitors::ShadowSuppressing;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CompletionKind {
    Property,
    Method,
    Parameter,
    Class,
    TypeAlias,
    TypeParameter,
    Module,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionItem {
    pub label: String,
    pub kind: CompletionKind,
    /// Type of a property, signature of a method.
    pub detail: String,
    pub insert_text: String,
}

/// Collects every visited declaration, closest first.
#[derive(Default)]
pub struct CompletionCollector {
    items: IndexMap<(String, CompletionKind), CompletionItem>,
}

impl CompletionCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_items(self) -> Vec<CompletionItem> {
        self.items.into_values().collect()
    }
}

impl ResolveVisitor for CompletionCollector {
    fn exact_name(&self) -> Option<&str> {
        None
    }

    fn visit(
        &mut self,
        name: &str,
        candidate: NodeRef,
        bindings: &TypeParameterBindings,
        ctx: &CheckerContext<'_>,
    ) -> bool {
        let Some(tree) = ctx.tree(candidate.module) else {
            return true;
        };
        let Some(data) = tree.data(candidate.node) else {
            return true;
        };
        let kind = match data {
            NodeData::Property { .. } => CompletionKind::Property,
            NodeData::Method { .. } => CompletionKind::Method,
            NodeData::Parameter { .. } => CompletionKind::Parameter,
            NodeData::Class { .. } => CompletionKind::Class,
            NodeData::TypeAlias { .. } => CompletionKind::TypeAlias,
            NodeData::TypeParameter { .. } => CompletionKind::TypeParameter,
            NodeData::Import { .. } | NodeData::Module { .. } => CompletionKind::Module,
            _ => return true,
        };
        let key = (name.to_string(), kind);
        if self.items.contains_key(&key) {
            return true;
        }
        let item = match data {
            NodeData::Method { params, .. } => CompletionItem {
                label: name.to_string(),
                kind,
                detail: method_signature(ctx, &tree, candidate, bindings),
                insert_text: method_insert_text(&tree, name, params),
            },
            _ => CompletionItem {
                label: name.to_string(),
                kind,
                detail: ctx.type_of_declaration(candidate, bindings).display(ctx),
                insert_text: name.to_string(),
            },
        };
        self.items.insert(key, item);
        true
    }
}

fn method_signature(
    ctx: &CheckerContext<'_>,
    tree: &SyntaxTree,
    method: NodeRef,
    bindings: &TypeParameterBindings,
) -> String {
    let Some(NodeData::Method { params, .. }) = tree.data(method.node) else {
        return String::new();
    };
    let params = params
        .iter()
        .map(|&param| match tree.data(param) {
            Some(NodeData::Parameter {
                name,
                type_annotation: Some(annotation),
            }) => format!("{name}: {}", print_node(tree, *annotation)),
            Some(NodeData::Parameter { name, .. }) => name.clone(),
            _ => String::new(),
        })
        .collect::<Vec<_>>()
        .join(", ");
    let ret = ctx.method_return_type(method, bindings);
    format!("({params}): {}", ret.display(ctx))
}

/// `name(a, b)`, where a parameter of function type becomes a lambda with
/// suggested parameter names: `sortWith((element1, element2) -> )`.
fn method_insert_text(tree: &SyntaxTree, name: &str, params: &[NodeIndex]) -> String {
    let args = params
        .iter()
        .map(|&param| match tree.data(param) {
            Some(NodeData::Parameter {
                type_annotation: Some(annotation),
                name,
            }) => match lambda_parameter_names(tree, *annotation) {
                Some(names) => format!("({}) -> ", names.join(", ")),
                None => name.clone(),
            },
            Some(NodeData::Parameter { name, .. }) => name.clone(),
            _ => String::new(),
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("{name}({args})")
}

/// Parameter names for a lambda passed where `type_node` is expected, or
/// `None` if it is not a function type. Names come from the declared
/// argument types, decapitalized; a name used more than once is numbered
/// from 1.
pub fn lambda_parameter_names(tree: &SyntaxTree, type_node: NodeIndex) -> Option<Vec<String>> {
    let mut node = type_node;
    let params = loop {
        match tree.data(node)? {
            NodeData::FunctionType { params, .. } => break params,
            NodeData::ParenthesizedType { inner } | NodeData::NullableType { inner } => {
                node = *inner;
            }
            _ => return None,
        }
    };
    let base: SmallVec<[String; 4]> = params
        .iter()
        .map(|&param| suggested_name(tree, param))
        .collect();
    let names = base
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let total = base.iter().filter(|other| *other == name).count();
            if total == 1 {
                return name.clone();
            }
            let ordinal = base[..i].iter().filter(|other| *other == name).count() + 1;
            format!("{name}{ordinal}")
        })
        .collect();
    Some(names)
}

fn suggested_name(tree: &SyntaxTree, type_node: NodeIndex) -> String {
    let type_name = match tree.data(type_node) {
        Some(NodeData::DeclaredType { name, .. }) => name.as_str(),
        Some(NodeData::NullableType { inner } | NodeData::ConstrainedType { inner, .. }) => {
            return suggested_name(tree, *inner);
        }
        Some(NodeData::FunctionType { .. }) => "function",
        _ => "it",
    };
    decapitalize(type_name)
}

fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

// =============================================================================
// Entry points
// =============================================================================

impl<'a> CheckerContext<'a> {
    /// Properties and methods visible by simple name at `site`.
    pub fn complete_unqualified(&self, site: NodeRef) -> Vec<CompletionItem> {
        let this_type = self.this_type(site);
        let mut visitor = ShadowSuppressing::new(CompletionCollector::new());
        for mode in [ResolveMode::Property, ResolveMode::Method] {
            resolve_unqualified_access(site, &this_type, mode, self, &mut visitor);
        }
        visitor.into_inner().into_items()
    }

    /// Members of the value `receiver` evaluates to, for `receiver.`.
    pub fn complete_qualified(&self, receiver: NodeRef) -> Vec<CompletionItem> {
        let receiver = self
            .type_of_expr(receiver, &TypeParameterBindings::new())
            .non_null(self);
        self.complete_members(&receiver)
    }

    pub fn complete_members(&self, receiver: &Type) -> Vec<CompletionItem> {
        let mut visitor = ShadowSuppressing::new(CompletionCollector::new());
        for mode in [ResolveMode::Property, ResolveMode::Method] {
            resolve_qualified_access(receiver, mode, self, &mut visitor);
        }
        visitor.into_inner().into_items()
    }

    /// Type names visible at `site`.
    pub fn complete_type_name(&self, site: NodeRef) -> Vec<CompletionItem> {
        let mut visitor = ShadowSuppressing::new(CompletionCollector::new());
        resolve_unqualified_access(site, &Type::Unknown, ResolveMode::Type, self, &mut visitor);
        visitor.into_inner().into_items()
    }
}
