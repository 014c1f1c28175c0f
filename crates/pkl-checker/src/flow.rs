//! Flow facts: what enclosing conditions say about a declaration.
//!
//! Collected by walking up from an access site. In the then-branch of
//! `if (x != null)` the fact is `x: NonNull`; in the else-branch of
//! `if (x is Int)` it is `x: IsNot(Int)`. Each fact is keyed by the
//! declaration its operand resolves to, so a `let` or lambda parameter that
//! shadows `x` is not narrowed by a guard on the outer `x`. The right operand of `&&` sees the
//! left operand's positive facts, the right operand of `||` its negative
//! ones.

use pkl_solver::{Type, TypeContext, TypeParameterBindings};
use pkl_syntax::{BinaryOp, NodeData, NodeIndex, NodeRef, SyntaxTree, UnaryOp};
use smallvec::SmallVec;

use crate::context::CheckerContext;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlowFact {
    NonNull,
    Is(Type),
    IsNot(Type),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlowFacts {
    /// Outermost condition first.
    facts: SmallVec<[(NodeRef, FlowFact); 2]>,
}

impl FlowFacts {
    pub fn collect(site: NodeRef, ctx: &CheckerContext<'_>) -> Self {
        let Some(tree) = ctx.tree(site.module) else {
            return Self::default();
        };
        let mut collector = Collector {
            ctx,
            tree: &tree,
            site,
            facts: SmallVec::new(),
        };
        let mut prev = site.node;
        for ancestor in tree.ancestors(site.node) {
            match tree.data(ancestor) {
                Some(NodeData::If {
                    condition,
                    then_branch,
                    else_branch,
                }) => {
                    if *then_branch == prev {
                        collector.positive(*condition);
                    } else if *else_branch == prev {
                        collector.negative(*condition);
                    }
                }
                Some(NodeData::Binary {
                    op: BinaryOp::And,
                    left,
                    right,
                }) if *right == prev => collector.positive(*left),
                Some(NodeData::Binary {
                    op: BinaryOp::Or,
                    left,
                    right,
                }) if *right == prev => collector.negative(*left),
                Some(NodeData::Class { .. } | NodeData::Module { .. }) => break,
                _ => {}
            }
            prev = ancestor;
        }
        // Collected innermost first; conditions apply outside in.
        collector.facts.reverse();
        Self {
            facts: collector.facts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn facts_for(&self, decl: NodeRef) -> impl Iterator<Item = &FlowFact> + '_ {
        self.facts
            .iter()
            .filter(move |(fact_decl, _)| *fact_decl == decl)
            .map(|(_, fact)| fact)
    }

    /// Narrow the declared type of `decl` by every fact about it.
    pub fn narrow(&self, decl: NodeRef, ty: Type, ctx: &dyn TypeContext) -> Type {
        self.facts_for(decl).fold(ty, |ty, fact| match fact {
            FlowFact::NonNull => ty.non_null(ctx),
            FlowFact::Is(asserted) => {
                if ty.is_unknown() || asserted.is_subtype_of(&ty, ctx) {
                    asserted.clone()
                } else if ty.is_subtype_of(asserted, ctx) {
                    ty
                } else {
                    asserted.clone()
                }
            }
            FlowFact::IsNot(excluded) => {
                if ty.is_unknown() {
                    return ty;
                }
                let unaliased = ty.fully_unaliased(ctx);
                let remaining: Vec<Type> = unaliased
                    .union_members()
                    .into_iter()
                    .filter(|member| !member.is_subtype_of(excluded, ctx))
                    .cloned()
                    .collect();
                if remaining.is_empty() {
                    Type::Nothing
                } else {
                    Type::union_all(remaining, ctx)
                }
            }
        })
    }
}

struct Collector<'t, 'c, 'a> {
    ctx: &'c CheckerContext<'a>,
    tree: &'t SyntaxTree,
    site: NodeRef,
    facts: SmallVec<[(NodeRef, FlowFact); 2]>,
}

impl Collector<'_, '_, '_> {
    /// Facts that hold when `condition` is true.
    fn positive(&mut self, condition: NodeIndex) {
        match self.tree.data(condition) {
            Some(NodeData::Binary { op, left, right }) => match op {
                BinaryOp::NotEq => self.null_comparison(*left, *right, FlowFact::NonNull),
                BinaryOp::And => {
                    self.positive(*right);
                    self.positive(*left);
                }
                _ => {}
            },
            Some(NodeData::TypeTest { operand, type_node }) => {
                if let Some(decl) = self.decl_of(*operand) {
                    let ty = self.asserted(*type_node);
                    self.facts.push((decl, FlowFact::Is(ty)));
                }
            }
            Some(NodeData::Unary {
                op: UnaryOp::Not,
                operand,
            }) => self.negative(*operand),
            Some(NodeData::Parenthesized { inner }) => self.positive(*inner),
            _ => {}
        }
    }

    /// Facts that hold when `condition` is false.
    fn negative(&mut self, condition: NodeIndex) {
        match self.tree.data(condition) {
            Some(NodeData::Binary { op, left, right }) => match op {
                BinaryOp::Eq => self.null_comparison(*left, *right, FlowFact::NonNull),
                BinaryOp::Or => {
                    self.negative(*right);
                    self.negative(*left);
                }
                _ => {}
            },
            Some(NodeData::TypeTest { operand, type_node }) => {
                if let Some(decl) = self.decl_of(*operand) {
                    let ty = self.asserted(*type_node);
                    self.facts.push((decl, FlowFact::IsNot(ty)));
                }
            }
            Some(NodeData::Unary {
                op: UnaryOp::Not,
                operand,
            }) => self.positive(*operand),
            Some(NodeData::Parenthesized { inner }) => self.negative(*inner),
            _ => {}
        }
    }

    /// `x <op> null` or `null <op> x`.
    fn null_comparison(&mut self, left: NodeIndex, right: NodeIndex, fact: FlowFact) {
        let is_null = |idx| matches!(self.tree.data(idx), Some(NodeData::NullLit));
        let decl = if is_null(right) {
            self.decl_of(left)
        } else if is_null(left) {
            self.decl_of(right)
        } else {
            None
        };
        if let Some(decl) = decl {
            self.facts.push((decl, fact));
        }
    }

    /// Declaration named by a plain property access, looking through
    /// parentheses.
    fn decl_of(&self, expr: NodeIndex) -> Option<NodeRef> {
        match self.tree.data(expr)? {
            NodeData::UnqualifiedAccess { args: None, .. } => self
                .ctx
                .resolve_access(self.site.with_node(expr))
                .map(|resolved| resolved.decl),
            NodeData::Parenthesized { inner } => self.decl_of(*inner),
            _ => None,
        }
    }

    fn asserted(&self, type_node: NodeIndex) -> Type {
        self.ctx
            .type_of_type_node(self.site.with_node(type_node), &TypeParameterBindings::new())
    }
}
