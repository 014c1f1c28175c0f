//! Static evaluation of constant expressions and type constraints.
//!
//! Only a small, side-effect free fragment is understood: literals,
//! arithmetic, comparisons, boolean logic, `if`, `??` and a fixed set of
//! `String`/`Int`/`Float` properties and methods. Anything else evaluates to
//! "unknown" (`None`), which a constraint reports as [`ConstraintValue::Error`].

use std::cmp::Ordering;
use std::sync::Arc;

use pkl_common::limits::MAX_CONSTANT_EVAL_DEPTH;
use pkl_syntax::{BinaryOp, NodeData, NodeIndex, SyntaxTree, UnaryOp};
use tracing::trace;

#[derive(Clone, Debug, PartialEq)]
pub enum ConstantValue {
    Null,
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(Arc<str>),
    /// `Regex("...")`, holding the pattern.
    Regex(Arc<str>),
}

impl ConstantValue {
    /// Pkl source form, used in diagnostic messages.
    pub fn render(&self) -> String {
        match self {
            ConstantValue::Null => "null".to_string(),
            ConstantValue::Boolean(b) => b.to_string(),
            ConstantValue::Int(i) => i.to_string(),
            ConstantValue::Float(f) if f.is_nan() => "NaN".to_string(),
            ConstantValue::Float(f) if f.is_infinite() => {
                if *f > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
            }
            ConstantValue::Float(f) if f.fract() == 0.0 => format!("{f:.1}"),
            ConstantValue::Float(f) => f.to_string(),
            ConstantValue::String(s) => format!("{s:?}"),
            ConstantValue::Regex(p) => format!("Regex({p:?})"),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match *self {
            ConstantValue::Int(i) => Some(i as f64),
            ConstantValue::Float(f) => Some(f),
            _ => None,
        }
    }
}

/// Three-valued outcome of a constraint.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConstraintValue {
    True,
    False,
    /// The constraint could not be decided statically.
    Error,
}

impl ConstraintValue {
    pub fn is_satisfied(self) -> bool {
        self == ConstraintValue::True
    }

    fn and(self, other: ConstraintValue) -> ConstraintValue {
        match (self, other) {
            (ConstraintValue::False, _) | (_, ConstraintValue::False) => ConstraintValue::False,
            (ConstraintValue::True, ConstraintValue::True) => ConstraintValue::True,
            _ => ConstraintValue::Error,
        }
    }

    fn or(self, other: ConstraintValue) -> ConstraintValue {
        match (self, other) {
            (ConstraintValue::True, _) | (_, ConstraintValue::True) => ConstraintValue::True,
            (ConstraintValue::False, ConstraintValue::False) => ConstraintValue::False,
            _ => ConstraintValue::Error,
        }
    }

    fn not(self) -> ConstraintValue {
        match self {
            ConstraintValue::True => ConstraintValue::False,
            ConstraintValue::False => ConstraintValue::True,
            ConstraintValue::Error => ConstraintValue::Error,
        }
    }
}

impl From<bool> for ConstraintValue {
    fn from(value: bool) -> Self {
        if value {
            ConstraintValue::True
        } else {
            ConstraintValue::False
        }
    }
}

/// Statically evaluate `expr`, if it is a constant.
pub fn constant_value(tree: &SyntaxTree, expr: NodeIndex) -> Option<ConstantValue> {
    Evaluator::new(tree, None).eval(expr)
}

/// Evaluate the constraint expression `expr` with `this` bound to `value`.
///
/// A constraint is either a boolean expression over the implicit receiver
/// (`length > 3`, `isBetween(0, 10)`) or a one-parameter lambda
/// (`(s) -> s.length > 3`).
pub fn evaluate_constraint(
    tree: &SyntaxTree,
    expr: NodeIndex,
    value: &ConstantValue,
) -> ConstraintValue {
    let mut evaluator = Evaluator::new(tree, Some(value));
    if let Some(NodeData::Lambda { params, body }) = tree.data(expr) {
        let [param] = params.as_slice() else {
            return ConstraintValue::Error;
        };
        evaluator.lambda_param = tree.name(*param);
        return evaluator.truth(*body);
    }
    evaluator.truth(expr)
}

struct Evaluator<'a> {
    tree: &'a SyntaxTree,
    this: Option<&'a ConstantValue>,
    lambda_param: Option<&'a str>,
    depth: u32,
}

impl<'a> Evaluator<'a> {
    fn new(tree: &'a SyntaxTree, this: Option<&'a ConstantValue>) -> Self {
        Self {
            tree,
            this,
            lambda_param: None,
            depth: 0,
        }
    }

    fn truth(&mut self, expr: NodeIndex) -> ConstraintValue {
        if self.depth >= MAX_CONSTANT_EVAL_DEPTH {
            return ConstraintValue::Error;
        }
        self.depth += 1;
        let result = self.truth_inner(expr);
        self.depth -= 1;
        result
    }

    fn truth_inner(&mut self, expr: NodeIndex) -> ConstraintValue {
        let tree = self.tree;
        match tree.data(expr) {
            Some(NodeData::Binary {
                op: BinaryOp::And,
                left,
                right,
            }) => {
                let left = self.truth(*left);
                if left == ConstraintValue::False {
                    return left;
                }
                left.and(self.truth(*right))
            }
            Some(NodeData::Binary {
                op: BinaryOp::Or,
                left,
                right,
            }) => {
                let left = self.truth(*left);
                if left == ConstraintValue::True {
                    return left;
                }
                left.or(self.truth(*right))
            }
            Some(NodeData::Unary {
                op: UnaryOp::Not,
                operand,
            }) => self.truth(*operand).not(),
            Some(NodeData::Parenthesized { inner }) => self.truth(*inner),
            _ => match self.eval(expr) {
                Some(ConstantValue::Boolean(b)) => b.into(),
                _ => ConstraintValue::Error,
            },
        }
    }

    fn eval(&mut self, expr: NodeIndex) -> Option<ConstantValue> {
        if self.depth >= MAX_CONSTANT_EVAL_DEPTH {
            trace!("constant evaluation depth exceeded");
            return None;
        }
        self.depth += 1;
        let result = self.eval_inner(expr);
        self.depth -= 1;
        result
    }

    fn eval_inner(&mut self, expr: NodeIndex) -> Option<ConstantValue> {
        let tree = self.tree;
        match tree.data(expr)? {
            NodeData::StringLit(s) => Some(ConstantValue::String(s.as_str().into())),
            NodeData::IntLit(i) => Some(ConstantValue::Int(*i)),
            NodeData::FloatLit(f) => Some(ConstantValue::Float(*f)),
            NodeData::BoolLit(b) => Some(ConstantValue::Boolean(*b)),
            NodeData::NullLit => Some(ConstantValue::Null),
            NodeData::This => self.this.cloned(),
            NodeData::Parenthesized { inner } => self.eval(*inner),
            NodeData::Unary { op, operand } => {
                let value = self.eval(*operand)?;
                match (op, value) {
                    (UnaryOp::Neg, ConstantValue::Int(i)) => i.checked_neg().map(ConstantValue::Int),
                    (UnaryOp::Neg, ConstantValue::Float(f)) => Some(ConstantValue::Float(-f)),
                    (UnaryOp::Not, ConstantValue::Boolean(b)) => Some(ConstantValue::Boolean(!b)),
                    _ => None,
                }
            }
            NodeData::Binary {
                op: BinaryOp::And | BinaryOp::Or,
                ..
            } => {
                match self.truth_inner(expr) {
                    ConstraintValue::True => Some(ConstantValue::Boolean(true)),
                    ConstraintValue::False => Some(ConstantValue::Boolean(false)),
                    ConstraintValue::Error => None,
                }
            }
            NodeData::Binary {
                op: BinaryOp::NullCoalesce,
                left,
                right,
            } => match self.eval(*left)? {
                ConstantValue::Null => self.eval(*right),
                value => Some(value),
            },
            NodeData::Binary { op, left, right } => {
                let left = self.eval(*left)?;
                let right = self.eval(*right)?;
                binary(*op, &left, &right)
            }
            NodeData::If {
                condition,
                then_branch,
                else_branch,
            } => match self.eval(*condition)? {
                ConstantValue::Boolean(true) => self.eval(*then_branch),
                ConstantValue::Boolean(false) => self.eval(*else_branch),
                _ => None,
            },
            NodeData::UnqualifiedAccess { name, args: None } => {
                if self.lambda_param == Some(name.as_str()) {
                    return self.this.cloned();
                }
                let this = self.this?;
                property(this, name)
            }
            NodeData::UnqualifiedAccess {
                name,
                args: Some(args),
            } => {
                let args = self.eval_args(args)?;
                if name == "Regex" {
                    return match args.as_slice() {
                        [ConstantValue::String(pattern)] => Some(ConstantValue::Regex(pattern.clone())),
                        _ => None,
                    };
                }
                let this = self.this?;
                method(this, name, &args)
            }
            NodeData::QualifiedAccess {
                receiver,
                name,
                args,
                null_safe,
            } => {
                let receiver = self.eval(*receiver)?;
                if *null_safe && receiver == ConstantValue::Null {
                    return Some(ConstantValue::Null);
                }
                match args {
                    None => property(&receiver, name),
                    Some(args) => {
                        let args = self.eval_args(args)?;
                        method(&receiver, name, &args)
                    }
                }
            }
            _ => None,
        }
    }

    fn eval_args(&mut self, args: &[NodeIndex]) -> Option<Vec<ConstantValue>> {
        args.iter().map(|&arg| self.eval(arg)).collect()
    }
}

// =============================================================================
// Operators and members
// =============================================================================

fn binary(op: BinaryOp, left: &ConstantValue, right: &ConstantValue) -> Option<ConstantValue> {
    use ConstantValue::{Boolean, Int, String as Str};
    match op {
        BinaryOp::Eq => Some(Boolean(values_equal(left, right))),
        BinaryOp::NotEq => Some(Boolean(!values_equal(left, right))),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = compare(left, right)?;
            let result = match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::LtEq => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Some(Boolean(result))
        }
        BinaryOp::Add => match (left, right) {
            (Str(a), Str(b)) => Some(Str(format!("{a}{b}").into())),
            (Int(a), Int(b)) => a.checked_add(*b).map(Int),
            _ => float_op(left, right, |a, b| a + b),
        },
        BinaryOp::Sub => match (left, right) {
            (Int(a), Int(b)) => a.checked_sub(*b).map(Int),
            _ => float_op(left, right, |a, b| a - b),
        },
        BinaryOp::Mul => match (left, right) {
            (Int(a), Int(b)) => a.checked_mul(*b).map(Int),
            _ => float_op(left, right, |a, b| a * b),
        },
        BinaryOp::Div => match (left, right) {
            (Int(_), Int(0)) => None,
            _ => float_op(left, right, |a, b| a / b),
        },
        BinaryOp::IntDiv => match (left, right) {
            (Int(a), Int(b)) => a.checked_div(*b).map(Int),
            _ => None,
        },
        BinaryOp::Rem => match (left, right) {
            (Int(a), Int(b)) => a.checked_rem(*b).map(Int),
            _ => float_op(left, right, |a, b| a % b),
        },
        BinaryOp::Pow => match (left, right) {
            (Int(a), Int(b)) if *b >= 0 => {
                u32::try_from(*b).ok().and_then(|exp| a.checked_pow(exp)).map(Int)
            }
            _ => float_op(left, right, f64::powf),
        },
        BinaryOp::And | BinaryOp::Or | BinaryOp::NullCoalesce | BinaryOp::Pipe => None,
    }
}

fn float_op(left: &ConstantValue, right: &ConstantValue, f: impl Fn(f64, f64) -> f64) -> Option<ConstantValue> {
    Some(ConstantValue::Float(f(left.as_f64()?, right.as_f64()?)))
}

fn values_equal(left: &ConstantValue, right: &ConstantValue) -> bool {
    match (left, right) {
        (ConstantValue::Int(a), ConstantValue::Float(b)) | (ConstantValue::Float(b), ConstantValue::Int(a)) => {
            (*a as f64) == *b
        }
        _ => left == right,
    }
}

fn compare(left: &ConstantValue, right: &ConstantValue) -> Option<Ordering> {
    match (left, right) {
        (ConstantValue::Int(a), ConstantValue::Int(b)) => Some(a.cmp(b)),
        (ConstantValue::String(a), ConstantValue::String(b)) => Some(a.cmp(b)),
        _ => left.as_f64()?.partial_cmp(&right.as_f64()?),
    }
}

fn property(value: &ConstantValue, name: &str) -> Option<ConstantValue> {
    use ConstantValue::{Boolean, Float, Int, String as Str};
    match (value, name) {
        (Str(s), "length") => Some(Int(s.chars().count() as i64)),
        (Str(s), "isEmpty") => Some(Boolean(s.is_empty())),
        (Str(s), "isBlank") => Some(Boolean(s.trim().is_empty())),
        (Str(s), "isRegex") => Some(Boolean(regex::Regex::new(s).is_ok())),
        (Str(s), "lastIndex") => Some(Int(s.chars().count() as i64 - 1)),

        (Int(i), "isEven") => Some(Boolean(i % 2 == 0)),
        (Int(i), "isOdd") => Some(Boolean(i % 2 != 0)),
        (Int(i), "isPositive") => Some(Boolean(*i >= 0)),
        (Int(i), "isNonZero") => Some(Boolean(*i != 0)),
        (Int(_), "isFinite") => Some(Boolean(true)),
        (Int(_), "isInfinite" | "isNaN") => Some(Boolean(false)),
        (Int(i), "abs") => i.checked_abs().map(Int),
        (Int(i), "sign") => Some(Int(i.signum())),

        (Float(f), "isPositive") => Some(Boolean(*f >= 0.0)),
        (Float(f), "isNonZero") => Some(Boolean(*f != 0.0)),
        (Float(f), "isFinite") => Some(Boolean(f.is_finite())),
        (Float(f), "isInfinite") => Some(Boolean(f.is_infinite())),
        (Float(f), "isNaN") => Some(Boolean(f.is_nan())),
        (Float(f), "abs") => Some(Float(f.abs())),
        (Float(f), "sign") if *f == 0.0 || f.is_nan() => Some(Float(*f)),
        (Float(f), "sign") => Some(Float(f.signum())),

        (ConstantValue::Regex(pattern), "pattern") => Some(Str(pattern.clone())),
        _ => None,
    }
}

fn method(value: &ConstantValue, name: &str, args: &[ConstantValue]) -> Option<ConstantValue> {
    use ConstantValue::{Boolean, Float, Int, String as Str};
    match (value, name, args) {
        (Str(s), "startsWith", [Str(p)]) => Some(Boolean(s.starts_with(&**p))),
        (Str(s), "endsWith", [Str(p)]) => Some(Boolean(s.ends_with(&**p))),
        (Str(s), "contains", [Str(p)]) => Some(Boolean(s.contains(&**p))),
        (Str(s), "matches", [ConstantValue::Regex(p)]) => {
            let anchored = regex::Regex::new(&format!("^(?:{p})$")).ok()?;
            Some(Boolean(anchored.is_match(s)))
        }
        (Str(s), "toUpperCase", []) => Some(Str(s.to_uppercase().into())),
        (Str(s), "toLowerCase", []) => Some(Str(s.to_lowercase().into())),
        (Str(s), "trim", []) => Some(Str(s.trim().into())),
        (Str(s), "reverse", []) => Some(Str(s.chars().rev().collect::<String>().into())),
        (Str(s), "repeat", [Int(n)]) => {
            let count = usize::try_from(*n).ok()?;
            Some(Str(s.repeat(count).into()))
        }

        (Int(_) | Float(_), "isBetween", [start, end]) => {
            let lower = compare(start, value)?;
            let upper = compare(value, end)?;
            Some(Boolean(lower != Ordering::Greater && upper != Ordering::Greater))
        }
        (Int(i), "toInt", []) => Some(Int(*i)),
        (Int(i), "toFloat", []) => Some(Float(*i as f64)),
        (Float(f), "toFloat", []) => Some(Float(*f)),
        (Float(f), "toInt", []) if f.is_finite() => Some(Int(f.trunc() as i64)),

        (Boolean(a), "xor", [Boolean(b)]) => Some(Boolean(a ^ b)),
        (Boolean(a), "implies", [Boolean(b)]) => Some(Boolean(!a || *b)),
        _ => None,
    }
}

#[cfg(test)]
#[path = "../tests/constraint_tests.rs"]
mod tests;
