//! Source-like rendering of expressions and type nodes.
//!
//! Used to quote constraint expressions in diagnostics and to render
//! constrained types (`String(length > 3)`). Binary operands are
//! parenthesised only where precedence requires it.

use std::fmt::Write;

use crate::node::{BinaryOp, NodeData, NodeIndex, UnaryOp};
use crate::tree::SyntaxTree;

pub fn print_node(tree: &SyntaxTree, idx: NodeIndex) -> String {
    let mut out = String::new();
    Printer { tree, out: &mut out }.node(idx);
    out
}

pub fn print_node_list(tree: &SyntaxTree, nodes: &[NodeIndex], separator: &str) -> String {
    let mut out = String::new();
    let mut printer = Printer { tree, out: &mut out };
    printer.list(nodes, separator);
    out
}

fn precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::NullCoalesce => 1,
        BinaryOp::Pipe => 2,
        BinaryOp::Or => 3,
        BinaryOp::And => 4,
        BinaryOp::Eq | BinaryOp::NotEq => 5,
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => 6,
        BinaryOp::Add | BinaryOp::Sub => 7,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::IntDiv | BinaryOp::Rem => 8,
        BinaryOp::Pow => 9,
    }
}

struct Printer<'a> {
    tree: &'a SyntaxTree,
    out: &'a mut String,
}

impl Printer<'_> {
    fn list(&mut self, nodes: &[NodeIndex], separator: &str) {
        for (i, &node) in nodes.iter().enumerate() {
            if i > 0 {
                self.out.push_str(separator);
            }
            self.node(node);
        }
    }

    fn args(&mut self, args: &Option<Vec<NodeIndex>>) {
        if let Some(args) = args {
            self.out.push('(');
            self.list(args, ", ");
            self.out.push(')');
        }
    }

    fn operand(&mut self, idx: NodeIndex, parent: u8, right: bool) {
        let needs_parens = match self.tree.data(idx) {
            Some(NodeData::Binary { op, .. }) => {
                let own = precedence(*op);
                own < parent || (right && own == parent)
            }
            Some(NodeData::If { .. } | NodeData::Let { .. } | NodeData::Lambda { .. }) => true,
            _ => false,
        };
        if needs_parens {
            self.out.push('(');
            self.node(idx);
            self.out.push(')');
        } else {
            self.node(idx);
        }
    }

    fn node(&mut self, idx: NodeIndex) {
        let tree = self.tree;
        let Some(data) = tree.data(idx) else {
            self.out.push_str("<missing>");
            return;
        };
        match data {
            // ----- types -----
            NodeData::DeclaredType {
                qualifier,
                name,
                type_args,
            } => {
                if let Some(qualifier) = qualifier {
                    self.out.push_str(qualifier);
                    self.out.push('.');
                }
                self.out.push_str(name);
                if !type_args.is_empty() {
                    self.out.push('<');
                    self.list(type_args, ", ");
                    self.out.push('>');
                }
            }
            NodeData::StringLiteralType { value } => self.quoted(value),
            NodeData::NullableType { inner } => {
                self.node(*inner);
                self.out.push('?');
            }
            NodeData::UnionType { left, right } => {
                self.node(*left);
                self.out.push('|');
                self.node(*right);
            }
            NodeData::ConstrainedType { inner, constraints } => {
                self.node(*inner);
                self.out.push('(');
                self.list(constraints, ", ");
                self.out.push(')');
            }
            NodeData::FunctionType { params, ret } => {
                self.out.push('(');
                self.list(params, ", ");
                self.out.push_str(") -> ");
                self.node(*ret);
            }
            NodeData::ParenthesizedType { inner } | NodeData::Parenthesized { inner } => {
                self.out.push('(');
                self.node(*inner);
                self.out.push(')');
            }
            NodeData::UnknownType => self.out.push_str("unknown"),
            NodeData::NothingType => self.out.push_str("nothing"),
            NodeData::ModuleType => self.out.push_str("module"),

            // ----- expressions -----
            NodeData::StringLit(value) => self.quoted(value),
            NodeData::IntLit(value) => {
                let _ = write!(self.out, "{value}");
            }
            NodeData::FloatLit(value) => {
                let _ = write!(self.out, "{value:?}");
            }
            NodeData::BoolLit(value) => {
                let _ = write!(self.out, "{value}");
            }
            NodeData::NullLit => self.out.push_str("null"),
            NodeData::This => self.out.push_str("this"),
            NodeData::Outer => self.out.push_str("outer"),
            NodeData::ModuleExpr => self.out.push_str("module"),
            NodeData::UnqualifiedAccess { name, args } => {
                self.out.push_str(name);
                self.args(args);
            }
            NodeData::QualifiedAccess {
                receiver,
                name,
                args,
                null_safe,
            } => {
                self.operand(*receiver, u8::MAX, false);
                self.out.push_str(if *null_safe { "?." } else { "." });
                self.out.push_str(name);
                self.args(args);
            }
            NodeData::SuperAccess { name, args } => {
                self.out.push_str("super.");
                self.out.push_str(name);
                self.args(args);
            }
            NodeData::New { type_node, .. } => {
                self.out.push_str("new ");
                if let Some(type_node) = type_node {
                    self.node(*type_node);
                    self.out.push(' ');
                }
                self.out.push_str("{ ... }");
            }
            NodeData::Amend { parent, .. } => {
                self.operand(*parent, u8::MAX, false);
                self.out.push_str(" { ... }");
            }
            NodeData::Binary { op, left, right } => {
                let prec = precedence(*op);
                self.operand(*left, prec, false);
                let _ = write!(self.out, " {} ", op.as_str());
                self.operand(*right, prec, true);
            }
            NodeData::Unary { op, operand } => {
                self.out.push(match op {
                    UnaryOp::Neg => '-',
                    UnaryOp::Not => '!',
                });
                self.operand(*operand, u8::MAX, false);
            }
            NodeData::NonNull { operand } => {
                self.operand(*operand, u8::MAX, false);
                self.out.push_str("!!");
            }
            NodeData::TypeTest { operand, type_node } => {
                self.operand(*operand, u8::MAX, false);
                self.out.push_str(" is ");
                self.node(*type_node);
            }
            NodeData::TypeCast { operand, type_node } => {
                self.operand(*operand, u8::MAX, false);
                self.out.push_str(" as ");
                self.node(*type_node);
            }
            NodeData::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.out.push_str("if (");
                self.node(*condition);
                self.out.push_str(") ");
                self.node(*then_branch);
                self.out.push_str(" else ");
                self.node(*else_branch);
            }
            NodeData::Let { param, value, body } => {
                self.out.push_str("let (");
                self.node(*param);
                self.out.push_str(" = ");
                self.node(*value);
                self.out.push_str(") ");
                self.node(*body);
            }
            NodeData::Lambda { params, body } => {
                self.out.push('(');
                self.list(params, ", ");
                self.out.push_str(") -> ");
                self.node(*body);
            }
            NodeData::ImportExpr { uri, glob } => {
                self.out.push_str(if *glob { "import*(" } else { "import(" });
                self.quoted(uri);
                self.out.push(')');
            }
            NodeData::Subscript { receiver, index } => {
                self.operand(*receiver, u8::MAX, false);
                self.out.push('[');
                self.node(*index);
                self.out.push(']');
            }
            NodeData::Throw { message } => {
                self.out.push_str("throw(");
                self.node(*message);
                self.out.push(')');
            }

            // ----- declarations (rendered by name) -----
            NodeData::Parameter {
                name,
                type_annotation,
            } => {
                self.out.push_str(name);
                if let Some(annotation) = type_annotation {
                    self.out.push_str(": ");
                    self.node(*annotation);
                }
            }
            NodeData::TypeParameter { name, .. } => self.out.push_str(name),
            other => match other.name() {
                Some(name) => self.out.push_str(name),
                None => self.out.push_str(other.kind_name()),
            },
        }
    }

    fn quoted(&mut self, value: &str) {
        self.out.push('"');
        for c in value.chars() {
            match c {
                '"' => self.out.push_str("\\\""),
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                '\t' => self.out.push_str("\\t"),
                c => self.out.push(c),
            }
        }
        self.out.push('"');
    }
}
