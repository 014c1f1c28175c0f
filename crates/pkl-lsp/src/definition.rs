//! Go-to-definition requests.

use pkl_checker::CheckerContext;
use pkl_common::Span;
use pkl_solver::TypeContext;
use pkl_syntax::{NodeData, NodeRef};
use serde::Serialize;
use tracing::debug_span;

use crate::workspace::Workspace;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Location {
    pub uri: String,
    pub span: Span,
}

impl Workspace {
    /// Declaration of the name under `offset`: a property or method access,
    /// a type name, or an import (which leads to the imported module).
    pub fn definition(&self, uri: &str, offset: u32) -> Option<Location> {
        let tree = self.tree(uri)?;
        let node = tree.node_at_offset(offset)?;
        let _span = debug_span!("definition", uri, offset).entered();
        let ctx = self.checker();
        let site = tree.node_ref(node);
        let decl = match tree.data(node)? {
            NodeData::UnqualifiedAccess { .. } | NodeData::QualifiedAccess { .. } => {
                ctx.resolve_access(site)?.decl
            }
            NodeData::DeclaredType {
                qualifier: None,
                name,
                ..
            } => ctx.resolve_type_name(site, name)?.decl,
            NodeData::DeclaredType {
                qualifier: Some(qualifier),
                name,
                ..
            } => ctx.resolve_qualified_type(site, qualifier, name)?.decl,
            NodeData::Import { .. } => ctx.module_root(ctx.imported_module(site)?)?,
            NodeData::ImportExpr { uri: target, .. } => {
                ctx.module_root(ctx.resolve_module(site.module, target)?)?
            }
            _ => return None,
        };
        location(&ctx, decl)
    }
}

fn location(ctx: &CheckerContext<'_>, decl: NodeRef) -> Option<Location> {
    let tree = ctx.tree(decl.module)?;
    Some(Location {
        uri: tree.uri().to_string(),
        span: tree.span(decl.node),
    })
}
