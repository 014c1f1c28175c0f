//! Immutable syntax tree arena.

use pkl_common::Span;
use pkl_common::limits::MAX_TREE_WALK_ITERATIONS;
use smallvec::SmallVec;

use crate::node::{
    Modifiers, ModuleClause, ModuleId, Node, NodeData, NodeIndex, NodeRef,
};

/// One parsed module: an arena of nodes rooted at a `NodeData::Module`.
///
/// Child links live in `NodeData`; parent links are filled in by the builder.
/// A tree is shared as `Arc<SyntaxTree>` and never mutated after `finish`.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    uri: String,
    module: ModuleId,
    nodes: Vec<Node>,
    root: NodeIndex,
}

impl SyntaxTree {
    pub(crate) fn from_parts(
        uri: String,
        module: ModuleId,
        nodes: Vec<Node>,
        root: NodeIndex,
    ) -> Self {
        Self {
            uri,
            module,
            nodes,
            root,
        }
    }

    #[inline]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[inline]
    pub fn module_id(&self) -> ModuleId {
        self.module
    }

    #[inline]
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn node_ref(&self, idx: NodeIndex) -> NodeRef {
        NodeRef::new(self.module, idx)
    }

    // =========================================================================
    // Node access
    // =========================================================================

    #[inline]
    pub fn get(&self, idx: NodeIndex) -> Option<&Node> {
        if idx.is_none() {
            return None;
        }
        self.nodes.get(idx.0 as usize)
    }

    #[inline]
    pub fn data(&self, idx: NodeIndex) -> Option<&NodeData> {
        self.get(idx).map(|node| &node.data)
    }

    pub fn span(&self, idx: NodeIndex) -> Span {
        self.get(idx).map_or(Span::DUMMY, |node| node.span)
    }

    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.get(idx)
            .map(|node| node.parent)
            .filter(|parent| parent.is_some())
    }

    pub fn children(&self, idx: NodeIndex) -> SmallVec<[NodeIndex; 4]> {
        self.data(idx).map(NodeData::children).unwrap_or_default()
    }

    pub fn name(&self, idx: NodeIndex) -> Option<&str> {
        self.data(idx).and_then(NodeData::name)
    }

    pub fn modifiers(&self, idx: NodeIndex) -> Modifiers {
        self.data(idx).map(NodeData::modifiers).unwrap_or_default()
    }

    /// Walk from `idx`'s parent to the root.
    ///
    /// Bounded by `MAX_TREE_WALK_ITERATIONS` so a malformed parent chain
    /// cannot loop forever.
    pub fn ancestors(&self, idx: NodeIndex) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            current: self.parent(idx),
            steps: 0,
        }
    }

    /// First ancestor (excluding `idx` itself) whose data matches.
    pub fn find_ancestor(
        &self,
        idx: NodeIndex,
        pred: impl Fn(&NodeData) -> bool,
    ) -> Option<NodeIndex> {
        self.ancestors(idx)
            .find(|&ancestor| self.data(ancestor).is_some_and(&pred))
    }

    pub fn enclosing_class(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.find_ancestor(idx, |data| matches!(data, NodeData::Class { .. }))
    }

    // =========================================================================
    // Module-level queries
    // =========================================================================

    pub fn module_clause(&self) -> Option<&ModuleClause> {
        match self.data(self.root)? {
            NodeData::Module { clause, .. } => clause.as_ref(),
            _ => None,
        }
    }

    pub fn module_name(&self) -> Option<&str> {
        match self.data(self.root)? {
            NodeData::Module { name, .. } => name.as_deref(),
            _ => None,
        }
    }

    pub fn imports(&self) -> &[NodeIndex] {
        match self.data(self.root) {
            Some(NodeData::Module { imports, .. }) => imports,
            _ => &[],
        }
    }

    pub fn module_members(&self) -> &[NodeIndex] {
        match self.data(self.root) {
            Some(NodeData::Module { members, .. }) => members,
            _ => &[],
        }
    }

    /// Members declared directly in a module, class or object body.
    pub fn members_of(&self, container: NodeIndex) -> &[NodeIndex] {
        match self.data(container) {
            Some(NodeData::Module { members, .. })
            | Some(NodeData::Class { members, .. })
            | Some(NodeData::ObjectBody { members, .. }) => members,
            _ => &[],
        }
    }

    /// Find a top-level class or type alias by name.
    pub fn find_type_decl(&self, name: &str) -> Option<NodeIndex> {
        self.module_members().iter().copied().find(|&member| {
            matches!(
                self.data(member),
                Some(NodeData::Class { .. } | NodeData::TypeAlias { .. })
            ) && self.name(member) == Some(name)
        })
    }

    /// Find a property or method directly declared in `container`.
    pub fn find_member(&self, container: NodeIndex, name: &str, method: bool) -> Option<NodeIndex> {
        self.members_of(container).iter().copied().find(|&member| {
            let kind_matches = match self.data(member) {
                Some(NodeData::Property { .. }) => !method,
                Some(NodeData::Method { .. }) => method,
                _ => false,
            };
            kind_matches && self.name(member) == Some(name)
        })
    }

    /// Innermost node whose span contains `offset`.
    pub fn node_at_offset(&self, offset: u32) -> Option<NodeIndex> {
        let mut current = self.root;
        if !self.span(current).contains(offset) {
            return None;
        }
        let mut steps = 0;
        'descend: loop {
            steps += 1;
            if steps > MAX_TREE_WALK_ITERATIONS {
                return Some(current);
            }
            for child in self.children(current) {
                if self.span(child).contains(offset) {
                    current = child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }

    /// Every node index in arena order.
    pub fn indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        (0..self.nodes.len() as u32).map(NodeIndex)
    }
}

pub struct Ancestors<'a> {
    tree: &'a SyntaxTree,
    current: Option<NodeIndex>,
    steps: u32,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<NodeIndex> {
        let current = self.current?;
        self.steps += 1;
        if self.steps > MAX_TREE_WALK_ITERATIONS {
            tracing::warn!(uri = self.tree.uri(), "ancestor walk exceeded iteration limit");
            self.current = None;
            return None;
        }
        self.current = self.tree.parent(current);
        Some(current)
    }
}
