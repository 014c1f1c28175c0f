//! Expression typing.

use pkl_solver::{InFlightKey, Type, TypeContext, TypeParameterBindings, project_to};
use pkl_syntax::{BinaryOp, NodeData, NodeIndex, NodeRef, UnaryOp};

use crate::context::CheckerContext;
use crate::flow::FlowFacts;
use crate::resolve::{ResolveMode, resolve_qualified_access, resolve_unqualified_access};
use crate::visitors::{CallSite, TypeOfFirstMatch};

impl<'a> CheckerContext<'a> {
    /// Static type of an expression. `Unknown` when nothing better is known,
    /// including when the expression's type depends on itself.
    pub fn type_of_expr(&self, expr: NodeRef, bindings: &TypeParameterBindings) -> Type {
        self.in_flight()
            .scope(InFlightKey::ExprType(expr), Type::Unknown, || {
                self.compute_expr_type(expr, bindings)
            })
    }

    fn compute_expr_type(&self, expr: NodeRef, bindings: &TypeParameterBindings) -> Type {
        let Some(tree) = self.tree(expr.module) else {
            return Type::Unknown;
        };
        let Some(data) = tree.data(expr.node) else {
            return Type::Unknown;
        };
        let base = self.base();
        let at = |idx: NodeIndex| expr.with_node(idx);

        match data {
            NodeData::StringLit(value) => Type::string_literal(value),
            NodeData::IntLit(_) => base.int_type(),
            NodeData::FloatLit(_) => base.float_type(),
            NodeData::BoolLit(_) => base.boolean_type(),
            NodeData::NullLit => base.null_type(),
            NodeData::This => self.this_type(expr),
            NodeData::Outer => self.outer_type(expr),
            NodeData::ModuleExpr => Type::module(expr.module, None, self),

            NodeData::UnqualifiedAccess { name, args } => {
                self.type_of_unqualified_access(expr, name, args.as_deref())
            }
            NodeData::QualifiedAccess {
                receiver,
                name,
                args,
                null_safe,
            } => {
                let receiver = self.type_of_expr(at(*receiver), bindings);
                let receiver = if *null_safe {
                    receiver.non_null(self)
                } else {
                    receiver
                };
                let call = args.as_deref().map(|args| CallSite {
                    module: expr.module,
                    args,
                });
                let mut visitor = TypeOfFirstMatch::new(name)
                    .with_call(call)
                    .null_safe(*null_safe);
                let mode = ResolveMode::for_access(args.as_ref());
                resolve_qualified_access(&receiver, mode, self, &mut visitor);
                visitor.into_type().unwrap_or(Type::Unknown)
            }
            NodeData::SuperAccess { name, args } => {
                let Some(receiver) = self.super_type(expr) else {
                    return Type::Unknown;
                };
                let call = args.as_deref().map(|args| CallSite {
                    module: expr.module,
                    args,
                });
                let mut visitor = TypeOfFirstMatch::new(name).with_call(call);
                let mode = ResolveMode::for_access(args.as_ref());
                resolve_qualified_access(&receiver, mode, self, &mut visitor);
                visitor.into_type().unwrap_or(Type::Unknown)
            }

            NodeData::New { type_node, .. } => match type_node {
                Some(type_node) => self.type_of_type_node(at(*type_node), bindings).instantiated(self),
                None => {
                    let expected = self.expected_type_of(expr);
                    if expected.is_unknown() {
                        base.dynamic_type()
                    } else {
                        expected.non_null(self).amending(self)
                    }
                }
            },
            NodeData::Amend { parent, .. } => self.type_of_expr(at(*parent), bindings).amended(self),

            NodeData::Binary { op, left, right } => {
                self.type_of_binary(*op, at(*left), at(*right), bindings)
            }
            NodeData::Unary { op, operand } => match op {
                UnaryOp::Not => base.boolean_type(),
                UnaryOp::Neg => self.type_of_expr(at(*operand), bindings),
            },
            NodeData::NonNull { operand } => self.type_of_expr(at(*operand), bindings).non_null(self),
            NodeData::TypeTest { .. } => base.boolean_type(),
            NodeData::TypeCast { type_node, .. } => self.type_of_type_node(at(*type_node), bindings),
            NodeData::If {
                then_branch,
                else_branch,
                ..
            } => {
                let then_type = self.type_of_expr(at(*then_branch), bindings);
                let else_type = self.type_of_expr(at(*else_branch), bindings);
                Type::union(then_type, else_type, self)
            }
            NodeData::Let { body, .. } => self.type_of_expr(at(*body), bindings),
            NodeData::Lambda { body, .. } => {
                let params = self.lambda_parameter_types(expr);
                let result = self.type_of_expr(at(*body), bindings);
                base.function_type(params, result)
            }
            NodeData::ImportExpr { uri, .. } => match self.resolve_module(expr.module, uri) {
                Some(module) => Type::module(module, None, self),
                None => Type::Unknown,
            },
            NodeData::Subscript { receiver, .. } => {
                let receiver = self.type_of_expr(at(*receiver), bindings);
                self.subscript_type(&receiver)
            }
            NodeData::Parenthesized { inner } => self.type_of_expr(at(*inner), bindings),
            NodeData::Throw { .. } => Type::Nothing,
            _ => Type::Unknown,
        }
    }

    fn type_of_unqualified_access(
        &self,
        site: NodeRef,
        name: &str,
        args: Option<&[NodeIndex]>,
    ) -> Type {
        let this_type = self.this_type(site);
        let mode = ResolveMode::for_access(args);
        let facts = match mode {
            ResolveMode::Property => FlowFacts::collect(site, self),
            _ => FlowFacts::default(),
        };
        let call = args.map(|args| CallSite {
            module: site.module,
            args,
        });
        let mut visitor = TypeOfFirstMatch::new(name).with_facts(facts).with_call(call);
        resolve_unqualified_access(site, &this_type, mode, self, &mut visitor);
        visitor.into_type().unwrap_or(Type::Unknown)
    }

    fn type_of_binary(
        &self,
        op: BinaryOp,
        left: NodeRef,
        right: NodeRef,
        bindings: &TypeParameterBindings,
    ) -> Type {
        let base = self.base();
        match op {
            BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::Lt
            | BinaryOp::LtEq
            | BinaryOp::Gt
            | BinaryOp::GtEq
            | BinaryOp::And
            | BinaryOp::Or => base.boolean_type(),
            BinaryOp::NullCoalesce => {
                let left = self.type_of_expr(left, bindings).non_null(self);
                let right = self.type_of_expr(right, bindings);
                Type::union(left, right, self)
            }
            BinaryOp::Pipe => {
                let function = self.type_of_expr(right, bindings).fully_unaliased(self);
                match &function {
                    Type::Class(class) if base.is_function_class(class.decl) => {
                        class.type_args.last().cloned().unwrap_or(Type::Unknown)
                    }
                    _ => Type::Unknown,
                }
            }
            BinaryOp::IntDiv => base.int_type(),
            BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Rem
            | BinaryOp::Pow => {
                let left = self.type_of_expr(left, bindings);
                let right = self.type_of_expr(right, bindings);
                self.arithmetic_type(op, &left, &right)
            }
        }
    }

    fn arithmetic_type(&self, op: BinaryOp, left: &Type, right: &Type) -> Type {
        let base = self.base();
        let string = base.string_type();
        let int = base.int_type();
        let number = base.number_type();
        if left.is_unknown() || right.is_unknown() {
            return Type::Unknown;
        }
        if op == BinaryOp::Add && left.is_subtype_of(&string, self) {
            return string;
        }
        if left.is_subtype_of(&number, self) && right.is_subtype_of(&number, self) {
            let both_int = left.is_subtype_of(&int, self) && right.is_subtype_of(&int, self);
            return match op {
                BinaryOp::Div => base.float_type(),
                _ if both_int => int,
                _ if left.is_subtype_of(&base.float_type(), self)
                    || right.is_subtype_of(&base.float_type(), self) =>
                {
                    base.float_type()
                }
                _ => number,
            };
        }
        for quantity in [base.duration_type(), base.data_size_type()] {
            if left.is_subtype_of(&quantity, self) {
                return match op {
                    BinaryOp::Div if right.is_subtype_of(&quantity, self) => base.float_type(),
                    _ => quantity,
                };
            }
        }
        // Collections concatenate to the left operand's type.
        if op == BinaryOp::Add {
            return left.without_constraints();
        }
        Type::Unknown
    }

    /// Element type read by `receiver[index]`.
    fn subscript_type(&self, receiver: &Type) -> Type {
        let base = self.base();
        let Type::Class(class) = receiver.fully_unaliased(self) else {
            return Type::Unknown;
        };
        if class.decl == base.string {
            return base.string_type();
        }
        for (container, position) in [
            (base.listing, 0),
            (base.collection, 0),
            (base.mapping, 1),
            (base.map, 1),
        ] {
            if let Some(projected) = project_to(&class, container, self) {
                return projected
                    .type_args
                    .get(position)
                    .cloned()
                    .unwrap_or(Type::Unknown);
            }
        }
        Type::Unknown
    }

    /// Type of `outer`: the `this` type one object level out.
    fn outer_type(&self, site: NodeRef) -> Type {
        let Some(tree) = self.tree(site.module) else {
            return Type::Unknown;
        };
        let Some(body) = tree.find_ancestor(site.node, |d| matches!(d, NodeData::ObjectBody { .. }))
        else {
            return Type::Unknown;
        };
        match tree.parent(body) {
            Some(parent) => self.this_type(site.with_node(parent)),
            None => Type::Unknown,
        }
    }

    /// Receiver type of `super.name`: the supertype of the enclosing class,
    /// or the supermodule at module level.
    fn super_type(&self, site: NodeRef) -> Option<Type> {
        let tree = self.tree(site.module)?;
        match tree.enclosing_class(site.node) {
            Some(class) => self.supertype(site.with_node(class)),
            None => {
                let supermodule = self.supermodule(site.module)?;
                Some(Type::module(supermodule, None, self))
            }
        }
    }
}
