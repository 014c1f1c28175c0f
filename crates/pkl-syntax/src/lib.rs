//! Syntax tree model consumed by the Pkl semantic core.
//!
//! The parser lives outside this workspace. Whatever produces trees (the
//! incremental parser in the server, or the `TreeBuilder` in tests and for
//! the bundled standard library) hands over an immutable `SyntaxTree`:
//! an arena of nodes with kinds, children, spans and parent links.
//!
//! Trees are never mutated after construction; an edit produces a new tree.

pub mod builder;
pub mod node;
pub mod printer;
pub mod stdlib;
pub mod tree;

pub use builder::TreeBuilder;
pub use node::{
    BinaryOp, Modifier, ModifierToken, Modifiers, ModuleClause, ModuleClauseKind, ModuleId, Node,
    NodeData, NodeIndex, NodeRef, UnaryOp, Variance,
};
pub use printer::{print_node, print_node_list};
pub use tree::SyntaxTree;
