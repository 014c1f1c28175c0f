//! Hover requests: the type of whatever is under the cursor.

use pkl_common::Span;
use pkl_solver::TypeParameterBindings;
use pkl_syntax::NodeData;
use serde::Serialize;
use tracing::debug_span;

use crate::workspace::Workspace;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HoverInfo {
    pub contents: String,
    pub span: Span,
}

impl Workspace {
    pub fn hover(&self, uri: &str, offset: u32) -> Option<HoverInfo> {
        let tree = self.tree(uri)?;
        let node = tree.node_at_offset(offset)?;
        let _span = debug_span!("hover", uri, offset).entered();
        let ctx = self.checker();
        let site = tree.node_ref(node);
        let bindings = TypeParameterBindings::new();
        let data = tree.data(node)?;
        let contents = match data {
            NodeData::Class { name, .. } => format!("class {name}"),
            NodeData::TypeAlias { name, aliased, .. } => format!(
                "typealias {name} = {}",
                ctx.type_of_type_node(site.with_node(*aliased), &bindings)
                    .display(&ctx)
            ),
            NodeData::Property { name, .. }
            | NodeData::Method { name, .. }
            | NodeData::Parameter { name, .. } => format!(
                "{} {name}: {}",
                data.kind_name(),
                ctx.type_of_declaration(site, &bindings).display(&ctx)
            ),
            data if data.is_type_node() => ctx.type_of_type_node(site, &bindings).display(&ctx),
            data if data.kind_name() == "expression" => {
                ctx.type_of_expr(site, &bindings).display(&ctx)
            }
            _ => return None,
        };
        Some(HoverInfo {
            contents,
            span: tree.span(node),
        })
    }
}
