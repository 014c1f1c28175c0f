//! Type representation.
//!
//! `Type` is a closed enum: every consumer matches exhaustively, so adding a
//! variant forces each switch to be revisited. Payloads are immutable and
//! compared structurally; declarations are referenced through `NodeRef`.

use std::fmt;
use std::sync::Arc;

use pkl_syntax::{ModuleId, NodeRef};

// =============================================================================
// Constraints
// =============================================================================

/// Constraint expressions attached to a type, e.g. `length > 3` in
/// `String(length > 3)`. Each entry points at the expression node.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Constraints(Option<Arc<[NodeRef]>>);

impl Constraints {
    pub const NONE: Constraints = Constraints(None);

    pub fn new(exprs: Vec<NodeRef>) -> Self {
        if exprs.is_empty() {
            Self::NONE
        } else {
            Self(Some(exprs.into()))
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    #[inline]
    pub fn as_slice(&self) -> &[NodeRef] {
        self.0.as_deref().unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NodeRef> {
        self.as_slice().iter()
    }

    /// `self` followed by `other`.
    pub fn concat(&self, other: &Constraints) -> Constraints {
        match (self.is_empty(), other.is_empty()) {
            (_, true) => self.clone(),
            (true, false) => other.clone(),
            (false, false) => {
                let mut all = self.as_slice().to_vec();
                all.extend_from_slice(other.as_slice());
                Constraints::new(all)
            }
        }
    }
}

static NO_CONSTRAINTS: Constraints = Constraints::NONE;

impl fmt::Debug for Constraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

// =============================================================================
// Type
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    /// No static information. Top and bottom at once for subtyping.
    Unknown,
    /// The empty type; a subtype of everything.
    Nothing,
    Variable(VariableType),
    Class(ClassType),
    Module(ModuleType),
    Alias(AliasType),
    StringLiteral(StringLiteralType),
    Union(UnionType),
}

/// An unbound type parameter.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VariableType {
    pub param: NodeRef,
    pub constraints: Constraints,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClassType {
    pub decl: NodeRef,
    /// Always exactly as long as the class's declared type parameter list.
    pub type_args: Arc<[Type]>,
    pub constraints: Constraints,
}

/// A module, normalized to the topmost module of its amends chain.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModuleType {
    pub module: ModuleId,
    pub reference_name: Option<Arc<str>>,
    pub constraints: Constraints,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AliasType {
    pub decl: NodeRef,
    pub type_args: Arc<[Type]>,
    pub constraints: Constraints,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StringLiteralType {
    pub value: Arc<str>,
    pub constraints: Constraints,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UnionType {
    pub left: Arc<Type>,
    pub right: Arc<Type>,
    pub constraints: Constraints,
}

impl Type {
    pub fn variable(param: NodeRef) -> Type {
        Type::Variable(VariableType {
            param,
            constraints: Constraints::NONE,
        })
    }

    pub fn string_literal(value: &str) -> Type {
        Type::StringLiteral(StringLiteralType {
            value: value.into(),
            constraints: Constraints::NONE,
        })
    }

    /// Build a union without normalization. Prefer `Type::union`.
    pub(crate) fn raw_union(left: Type, right: Type) -> Type {
        Type::Union(UnionType {
            left: Arc::new(left),
            right: Arc::new(right),
            constraints: Constraints::NONE,
        })
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    #[inline]
    pub fn is_nothing(&self) -> bool {
        matches!(self, Type::Nothing)
    }

    pub fn constraints(&self) -> &Constraints {
        match self {
            Type::Unknown | Type::Nothing => &NO_CONSTRAINTS,
            Type::Variable(t) => &t.constraints,
            Type::Class(t) => &t.constraints,
            Type::Module(t) => &t.constraints,
            Type::Alias(t) => &t.constraints,
            Type::StringLiteral(t) => &t.constraints,
            Type::Union(t) => &t.constraints,
        }
    }

    #[inline]
    pub fn has_constraints(&self) -> bool {
        !self.constraints().is_empty()
    }

    /// Replace the constraint list. `Unknown` and `Nothing` carry none and
    /// are returned unchanged.
    pub fn with_constraints(&self, constraints: Constraints) -> Type {
        let mut ty = self.clone();
        match &mut ty {
            Type::Unknown | Type::Nothing => {}
            Type::Variable(t) => t.constraints = constraints,
            Type::Class(t) => t.constraints = constraints,
            Type::Module(t) => t.constraints = constraints,
            Type::Alias(t) => t.constraints = constraints,
            Type::StringLiteral(t) => t.constraints = constraints,
            Type::Union(t) => t.constraints = constraints,
        }
        ty
    }

    /// Append `extra` to the existing constraint list.
    pub fn with_added_constraints(&self, extra: &Constraints) -> Type {
        if extra.is_empty() {
            return self.clone();
        }
        self.with_constraints(self.constraints().concat(extra))
    }

    pub fn without_constraints(&self) -> Type {
        if self.has_constraints() {
            self.with_constraints(Constraints::NONE)
        } else {
            self.clone()
        }
    }

    /// Flattened union members, left to right. A non-union is its own
    /// single member. Union-level constraints are not distributed.
    pub fn union_members(&self) -> Vec<&Type> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(ty) = stack.pop() {
            match ty {
                Type::Union(u) => {
                    stack.push(&u.right);
                    stack.push(&u.left);
                }
                other => out.push(other),
            }
        }
        out
    }

    pub fn class_decl(&self) -> Option<NodeRef> {
        match self {
            Type::Class(c) => Some(c.decl),
            _ => None,
        }
    }

    pub fn type_args(&self) -> &[Type] {
        match self {
            Type::Class(c) => &c.type_args,
            Type::Alias(a) => &a.type_args,
            _ => &[],
        }
    }
}
