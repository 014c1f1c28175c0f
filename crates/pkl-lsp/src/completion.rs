//! Completion requests.

use pkl_checker::CompletionItem;
use pkl_syntax::NodeData;
use tracing::debug_span;

use crate::workspace::Workspace;

impl Workspace {
    /// Completion candidates at `offset` in the module at `uri`.
    ///
    /// On the name of a qualified access (`receiver.na|`) the receiver's
    /// members are offered; in a type annotation, type names; anywhere else,
    /// everything visible by simple name.
    pub fn completion(&self, uri: &str, offset: u32) -> Vec<CompletionItem> {
        let Some(tree) = self.tree(uri) else {
            return Vec::new();
        };
        let Some(node) = tree.node_at_offset(offset) else {
            return Vec::new();
        };
        let _span = debug_span!("completion", uri, offset).entered();
        let ctx = self.checker();
        let site = tree.node_ref(node);
        match tree.data(node) {
            Some(NodeData::QualifiedAccess { receiver, .. }) => {
                ctx.complete_qualified(site.with_node(*receiver))
            }
            Some(data) if data.is_type_node() => ctx.complete_type_name(site),
            _ => ctx.complete_unqualified(site),
        }
    }
}
