//! Node identifiers and node payloads.

use bitflags::bitflags;
use pkl_common::Span;
use smallvec::SmallVec;

// =============================================================================
// Identifiers
// =============================================================================

/// Identity of a module (one syntax tree) within a workspace.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub u32);

impl ModuleId {
    /// The bundled `pkl:base` module.
    pub const BASE: ModuleId = ModuleId(0);
}

/// Index of a node inside its tree's arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    pub const NONE: NodeIndex = NodeIndex(u32::MAX);

    #[inline]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    #[inline]
    pub fn is_some(self) -> bool {
        self != Self::NONE
    }
}

/// A node anywhere in the workspace: the module it lives in plus its index.
///
/// This is the handle the type algebra stores for declarations and
/// constraint expressions. It is `Copy` and compares by identity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef {
    pub module: ModuleId,
    pub node: NodeIndex,
}

impl NodeRef {
    #[inline]
    pub const fn new(module: ModuleId, node: NodeIndex) -> Self {
        Self { module, node }
    }

    /// A sibling reference in the same module.
    #[inline]
    pub const fn with_node(self, node: NodeIndex) -> Self {
        Self {
            module: self.module,
            node,
        }
    }
}

// =============================================================================
// Modifiers
// =============================================================================

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Modifier {
    Abstract,
    Open,
    Local,
    Hidden,
    Fixed,
    Const,
    External,
}

impl Modifier {
    pub fn as_str(self) -> &'static str {
        match self {
            Modifier::Abstract => "abstract",
            Modifier::Open => "open",
            Modifier::Local => "local",
            Modifier::Hidden => "hidden",
            Modifier::Fixed => "fixed",
            Modifier::Const => "const",
            Modifier::External => "external",
        }
    }

    pub fn flag(self) -> Modifiers {
        match self {
            Modifier::Abstract => Modifiers::ABSTRACT,
            Modifier::Open => Modifiers::OPEN,
            Modifier::Local => Modifiers::LOCAL,
            Modifier::Hidden => Modifiers::HIDDEN,
            Modifier::Fixed => Modifiers::FIXED,
            Modifier::Const => Modifiers::CONST,
            Modifier::External => Modifiers::EXTERNAL,
        }
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const ABSTRACT = 1 << 0;
        const OPEN = 1 << 1;
        const LOCAL = 1 << 2;
        const HIDDEN = 1 << 3;
        const FIXED = 1 << 4;
        const CONST = 1 << 5;
        const EXTERNAL = 1 << 6;
    }
}

/// A modifier as written in source, in order of appearance.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ModifierToken {
    pub modifier: Modifier,
    pub span: Span,
}

pub fn modifier_flags(tokens: &[ModifierToken]) -> Modifiers {
    tokens
        .iter()
        .fold(Modifiers::empty(), |flags, token| flags | token.modifier.flag())
}

/// Name an import binds when it has no `as` clause: the last path segment
/// of the URI without its `.pkl` extension.
///
/// `pkl:math` binds `math`, `@deps/util/strings.pkl` binds `strings`.
pub fn import_name(uri: &str) -> &str {
    let tail = match uri.rfind(['/', '#']) {
        Some(pos) => &uri[pos + 1..],
        None => uri.rsplit(':').next().unwrap_or(uri),
    };
    tail.strip_suffix(".pkl").unwrap_or(tail)
}

// =============================================================================
// Small enums
// =============================================================================

/// Declared variance of a type parameter (`in`, `out`, or neither).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Variance {
    #[default]
    Invariant,
    In,
    Out,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModuleClauseKind {
    Amends,
    Extends,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleClause {
    pub kind: ModuleClauseKind,
    pub uri: String,
    pub span: Span,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Rem,
    Pow,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    NullCoalesce,
    Pipe,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::IntDiv => "~/",
            BinaryOp::Rem => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::NullCoalesce => "??",
            BinaryOp::Pipe => "|>",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

// =============================================================================
// Node payloads
// =============================================================================

/// Node kind and children.
///
/// Declarations, object members, type nodes and expressions share one arena.
/// Child references are `NodeIndex`es into the same tree.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeData {
    // ----- declarations -----
    Module {
        name: Option<String>,
        modifiers: Vec<ModifierToken>,
        clause: Option<ModuleClause>,
        imports: Vec<NodeIndex>,
        members: Vec<NodeIndex>,
    },
    Import {
        uri: String,
        alias: Option<String>,
        glob: bool,
    },
    Class {
        name: String,
        modifiers: Vec<ModifierToken>,
        type_params: Vec<NodeIndex>,
        extends: Option<NodeIndex>,
        members: Vec<NodeIndex>,
    },
    TypeAlias {
        name: String,
        modifiers: Vec<ModifierToken>,
        type_params: Vec<NodeIndex>,
        aliased: NodeIndex,
    },
    TypeParameter {
        name: String,
        variance: Variance,
    },
    /// Class, module and object-body properties.
    Property {
        name: String,
        modifiers: Vec<ModifierToken>,
        type_annotation: Option<NodeIndex>,
        value: Option<NodeIndex>,
        bodies: Vec<NodeIndex>,
    },
    Method {
        name: String,
        modifiers: Vec<ModifierToken>,
        type_params: Vec<NodeIndex>,
        params: Vec<NodeIndex>,
        return_type: Option<NodeIndex>,
        body: Option<NodeIndex>,
    },
    /// Method, lambda, `let` and generator parameters.
    Parameter {
        name: String,
        type_annotation: Option<NodeIndex>,
    },

    // ----- object bodies -----
    ObjectBody {
        params: Vec<NodeIndex>,
        members: Vec<NodeIndex>,
    },
    Element {
        value: NodeIndex,
    },
    Entry {
        key: NodeIndex,
        value: Option<NodeIndex>,
        bodies: Vec<NodeIndex>,
    },
    ForGenerator {
        key: Option<NodeIndex>,
        value: NodeIndex,
        iterable: NodeIndex,
        body: NodeIndex,
    },
    WhenGenerator {
        condition: NodeIndex,
        body: NodeIndex,
        else_body: Option<NodeIndex>,
    },
    Spread {
        expr: NodeIndex,
        null_safe: bool,
    },

    // ----- type nodes -----
    DeclaredType {
        qualifier: Option<String>,
        name: String,
        type_args: Vec<NodeIndex>,
    },
    StringLiteralType {
        value: String,
    },
    NullableType {
        inner: NodeIndex,
    },
    UnionType {
        left: NodeIndex,
        right: NodeIndex,
    },
    ConstrainedType {
        inner: NodeIndex,
        constraints: Vec<NodeIndex>,
    },
    FunctionType {
        params: Vec<NodeIndex>,
        ret: NodeIndex,
    },
    ParenthesizedType {
        inner: NodeIndex,
    },
    UnknownType,
    NothingType,
    ModuleType,

    // ----- expressions -----
    StringLit(String),
    IntLit(i64),
    FloatLit(f64),
    BoolLit(bool),
    NullLit,
    This,
    Outer,
    ModuleExpr,
    UnqualifiedAccess {
        name: String,
        args: Option<Vec<NodeIndex>>,
    },
    QualifiedAccess {
        receiver: NodeIndex,
        name: String,
        args: Option<Vec<NodeIndex>>,
        null_safe: bool,
    },
    SuperAccess {
        name: String,
        args: Option<Vec<NodeIndex>>,
    },
    New {
        type_node: Option<NodeIndex>,
        body: NodeIndex,
    },
    Amend {
        parent: NodeIndex,
        body: NodeIndex,
    },
    Binary {
        op: BinaryOp,
        left: NodeIndex,
        right: NodeIndex,
    },
    Unary {
        op: UnaryOp,
        operand: NodeIndex,
    },
    NonNull {
        operand: NodeIndex,
    },
    TypeTest {
        operand: NodeIndex,
        type_node: NodeIndex,
    },
    TypeCast {
        operand: NodeIndex,
        type_node: NodeIndex,
    },
    If {
        condition: NodeIndex,
        then_branch: NodeIndex,
        else_branch: NodeIndex,
    },
    Let {
        param: NodeIndex,
        value: NodeIndex,
        body: NodeIndex,
    },
    Lambda {
        params: Vec<NodeIndex>,
        body: NodeIndex,
    },
    ImportExpr {
        uri: String,
        glob: bool,
    },
    Subscript {
        receiver: NodeIndex,
        index: NodeIndex,
    },
    Parenthesized {
        inner: NodeIndex,
    },
    Throw {
        message: NodeIndex,
    },
}

impl NodeData {
    /// Direct children in source order.
    pub fn children(&self) -> SmallVec<[NodeIndex; 4]> {
        let mut out = SmallVec::new();
        let push_opt = |out: &mut SmallVec<[NodeIndex; 4]>, idx: &Option<NodeIndex>| {
            if let Some(idx) = idx {
                out.push(*idx);
            }
        };
        match self {
            NodeData::Module {
                imports, members, ..
            } => {
                out.extend(imports.iter().copied());
                out.extend(members.iter().copied());
            }
            NodeData::Class {
                type_params,
                extends,
                members,
                ..
            } => {
                out.extend(type_params.iter().copied());
                push_opt(&mut out, extends);
                out.extend(members.iter().copied());
            }
            NodeData::TypeAlias {
                type_params,
                aliased,
                ..
            } => {
                out.extend(type_params.iter().copied());
                out.push(*aliased);
            }
            NodeData::Property {
                type_annotation,
                value,
                bodies,
                ..
            } => {
                push_opt(&mut out, type_annotation);
                push_opt(&mut out, value);
                out.extend(bodies.iter().copied());
            }
            NodeData::Method {
                type_params,
                params,
                return_type,
                body,
                ..
            } => {
                out.extend(type_params.iter().copied());
                out.extend(params.iter().copied());
                push_opt(&mut out, return_type);
                push_opt(&mut out, body);
            }
            NodeData::Parameter {
                type_annotation, ..
            } => push_opt(&mut out, type_annotation),
            NodeData::ObjectBody { params, members } => {
                out.extend(params.iter().copied());
                out.extend(members.iter().copied());
            }
            NodeData::Element { value } => out.push(*value),
            NodeData::Entry { key, value, bodies } => {
                out.push(*key);
                push_opt(&mut out, value);
                out.extend(bodies.iter().copied());
            }
            NodeData::ForGenerator {
                key,
                value,
                iterable,
                body,
            } => {
                push_opt(&mut out, key);
                out.push(*value);
                out.push(*iterable);
                out.push(*body);
            }
            NodeData::WhenGenerator {
                condition,
                body,
                else_body,
            } => {
                out.push(*condition);
                out.push(*body);
                push_opt(&mut out, else_body);
            }
            NodeData::Spread { expr, .. } => out.push(*expr),
            NodeData::DeclaredType { type_args, .. } => out.extend(type_args.iter().copied()),
            NodeData::NullableType { inner } | NodeData::ParenthesizedType { inner } => {
                out.push(*inner)
            }
            NodeData::UnionType { left, right } => {
                out.push(*left);
                out.push(*right);
            }
            NodeData::ConstrainedType { inner, constraints } => {
                out.push(*inner);
                out.extend(constraints.iter().copied());
            }
            NodeData::FunctionType { params, ret } => {
                out.extend(params.iter().copied());
                out.push(*ret);
            }
            NodeData::UnqualifiedAccess { args, .. } | NodeData::SuperAccess { args, .. } => {
                if let Some(args) = args {
                    out.extend(args.iter().copied());
                }
            }
            NodeData::QualifiedAccess { receiver, args, .. } => {
                out.push(*receiver);
                if let Some(args) = args {
                    out.extend(args.iter().copied());
                }
            }
            NodeData::New { type_node, body } => {
                push_opt(&mut out, type_node);
                out.push(*body);
            }
            NodeData::Amend { parent, body } => {
                out.push(*parent);
                out.push(*body);
            }
            NodeData::Binary { left, right, .. } => {
                out.push(*left);
                out.push(*right);
            }
            NodeData::Unary { operand, .. } | NodeData::NonNull { operand } => out.push(*operand),
            NodeData::TypeTest { operand, type_node } | NodeData::TypeCast { operand, type_node } => {
                out.push(*operand);
                out.push(*type_node);
            }
            NodeData::If {
                condition,
                then_branch,
                else_branch,
            } => {
                out.push(*condition);
                out.push(*then_branch);
                out.push(*else_branch);
            }
            NodeData::Let { param, value, body } => {
                out.push(*param);
                out.push(*value);
                out.push(*body);
            }
            NodeData::Lambda { params, body } => {
                out.extend(params.iter().copied());
                out.push(*body);
            }
            NodeData::Subscript { receiver, index } => {
                out.push(*receiver);
                out.push(*index);
            }
            NodeData::Parenthesized { inner } => out.push(*inner),
            NodeData::Throw { message } => out.push(*message),
            NodeData::Import { .. }
            | NodeData::TypeParameter { .. }
            | NodeData::StringLiteralType { .. }
            | NodeData::UnknownType
            | NodeData::NothingType
            | NodeData::ModuleType
            | NodeData::StringLit(_)
            | NodeData::IntLit(_)
            | NodeData::FloatLit(_)
            | NodeData::BoolLit(_)
            | NodeData::NullLit
            | NodeData::This
            | NodeData::Outer
            | NodeData::ModuleExpr
            | NodeData::ImportExpr { .. } => {}
        }
        out
    }

    /// Declared name of a named declaration.
    pub fn name(&self) -> Option<&str> {
        match self {
            NodeData::Module { name, .. } => name.as_deref(),
            NodeData::Import { uri, alias, .. } => {
                Some(alias.as_deref().unwrap_or_else(|| import_name(uri)))
            }
            NodeData::Class { name, .. }
            | NodeData::TypeAlias { name, .. }
            | NodeData::TypeParameter { name, .. }
            | NodeData::Property { name, .. }
            | NodeData::Method { name, .. }
            | NodeData::Parameter { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn modifier_tokens(&self) -> &[ModifierToken] {
        match self {
            NodeData::Module { modifiers, .. }
            | NodeData::Class { modifiers, .. }
            | NodeData::TypeAlias { modifiers, .. }
            | NodeData::Property { modifiers, .. }
            | NodeData::Method { modifiers, .. } => modifiers,
            _ => &[],
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        modifier_flags(self.modifier_tokens())
    }

    pub fn is_type_node(&self) -> bool {
        matches!(
            self,
            NodeData::DeclaredType { .. }
                | NodeData::StringLiteralType { .. }
                | NodeData::NullableType { .. }
                | NodeData::UnionType { .. }
                | NodeData::ConstrainedType { .. }
                | NodeData::FunctionType { .. }
                | NodeData::ParenthesizedType { .. }
                | NodeData::UnknownType
                | NodeData::NothingType
                | NodeData::ModuleType
        )
    }

    pub fn is_object_member(&self) -> bool {
        matches!(
            self,
            NodeData::Property { .. }
                | NodeData::Method { .. }
                | NodeData::Element { .. }
                | NodeData::Entry { .. }
                | NodeData::ForGenerator { .. }
                | NodeData::WhenGenerator { .. }
                | NodeData::Spread { .. }
        )
    }

    /// Short human-readable kind, used in diagnostics ("class", "property", ...).
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeData::Module { .. } => "module",
            NodeData::Import { .. } => "import",
            NodeData::Class { .. } => "class",
            NodeData::TypeAlias { .. } => "type alias",
            NodeData::TypeParameter { .. } => "type parameter",
            NodeData::Property { .. } => "property",
            NodeData::Method { .. } => "method",
            NodeData::Parameter { .. } => "parameter",
            NodeData::ObjectBody { .. } => "object body",
            NodeData::Element { .. } => "element",
            NodeData::Entry { .. } => "entry",
            NodeData::ForGenerator { .. } => "for generator",
            NodeData::WhenGenerator { .. } => "when generator",
            NodeData::Spread { .. } => "spread",
            data if data.is_type_node() => "type",
            _ => "expression",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub data: NodeData,
    pub span: Span,
    pub parent: NodeIndex,
}
