//! Type-check engine: does a value of one type satisfy another?
//!
//! Both sides are distributed over aliases and unions before any subtype
//! test, the actual side first, so that every alternative of a union gets
//! its own nominal check and its own constraint check. Constraints are only evaluated when the
//! checked expression has a constant value.

use once_cell::unsync::OnceCell;
use pkl_common::limits::MAX_TYPE_CHECK_DEPTH;
use pkl_solver::{
    ConstantValue, Constraints, Type, TypeContext, UnionType, evaluate_constraint,
};
use pkl_syntax::print_node;
use tracing::trace;

use crate::context::CheckerContext;

/// Result of checking an actual type against an expected type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeCheckOutcome {
    Pass,
    /// The types share no common subtype; the value can never conform.
    TypeMismatch,
    /// The value conforms once `null` is excluded.
    NullableMismatch,
    /// The value may conform at run time, e.g. an `Any` where `String` is
    /// required.
    WeakMismatch,
    /// The value's type conforms but it fails a constraint. `required`
    /// holds every failing alternative, `found` the rendered value.
    ConstraintViolation { required: String, found: String },
}

impl TypeCheckOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, TypeCheckOutcome::Pass)
    }
}

impl<'a> CheckerContext<'a> {
    /// Check a value of type `actual` against `expected`. `value` yields the
    /// value's constant form and is called at most once, and only if a
    /// constraint needs it.
    pub fn check_type(
        &self,
        actual: &Type,
        expected: &Type,
        value: impl FnOnce() -> Option<ConstantValue>,
    ) -> TypeCheckOutcome {
        if expected.is_unknown() {
            return TypeCheckOutcome::Pass;
        }
        let mut engine = Engine {
            ctx: self,
            value: OnceCell::new(),
            compute_value: Some(value),
            failed: Vec::new(),
        };
        if engine.conforms(actual, expected, 0) {
            return TypeCheckOutcome::Pass;
        }
        if !engine.failed.is_empty() {
            let required = engine
                .failed
                .iter()
                .map(|alternative| self.render_constraints(alternative))
                .collect::<Vec<_>>()
                .join(" or ");
            let found = engine
                .value
                .get()
                .and_then(Option::as_ref)
                .map(ConstantValue::render)
                .unwrap_or_default();
            return TypeCheckOutcome::ConstraintViolation { required, found };
        }
        let expected = expected.without_constraints();
        if !actual.has_common_subtype_with(&expected, self) {
            TypeCheckOutcome::TypeMismatch
        } else if actual.is_nullable(self) && actual.non_null(self).is_subtype_of(&expected, self) {
            TypeCheckOutcome::NullableMismatch
        } else {
            TypeCheckOutcome::WeakMismatch
        }
    }

    fn render_constraints(&self, constraints: &Constraints) -> String {
        constraints
            .iter()
            .filter_map(|c| self.tree(c.module).map(|tree| print_node(&tree, c.node)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

struct Engine<'c, 'a, F> {
    ctx: &'c CheckerContext<'a>,
    value: OnceCell<Option<ConstantValue>>,
    compute_value: Option<F>,
    /// Constraint lists of the alternatives that failed, in visit order.
    failed: Vec<Constraints>,
}

impl<F: FnOnce() -> Option<ConstantValue>> Engine<'_, '_, F> {
    /// Distributes over the actual side first: every member of an actual
    /// union must conform, each to some alternative of the expected type.
    fn conforms(&mut self, actual: &Type, expected: &Type, depth: u32) -> bool {
        if expected.is_unknown() {
            return true;
        }
        if depth > MAX_TYPE_CHECK_DEPTH {
            trace!("type check depth exceeded, assuming conformance");
            return true;
        }
        let depth = depth + 1;
        match actual {
            Type::Alias(_) => {
                return self.conforms(&actual.fully_unaliased(self.ctx), expected, depth);
            }
            Type::Union(union) => {
                let left = self.conforms(&union.left, expected, depth);
                let right = self.conforms(&union.right, expected, depth);
                return left && right;
            }
            _ => {}
        }
        match expected {
            Type::Alias(_) => self.conforms(actual, &expected.fully_unaliased(self.ctx), depth),
            Type::Union(union) => {
                let (left, right) = distribute(union);
                let recorded = self.failed.len();
                // Both sides run so that each records its own failures.
                let left = self.conforms(actual, &left, depth);
                let right = self.conforms(actual, &right, depth);
                if left || right {
                    // Failures of the other alternative do not count.
                    self.failed.truncate(recorded);
                    return true;
                }
                false
            }
            _ => self.conforms_leaf(actual, expected),
        }
    }

    fn conforms_leaf(&mut self, actual: &Type, expected: &Type) -> bool {
        if !actual.is_subtype_of(&expected.without_constraints(), self.ctx) {
            return false;
        }
        let constraints = expected.constraints();
        if constraints.is_empty() {
            return true;
        }
        let Some(value) = self.value() else {
            return true;
        };
        for (index, constraint) in constraints.iter().enumerate() {
            let Some(tree) = self.ctx.tree(constraint.module) else {
                continue;
            };
            let outcome = evaluate_constraint(&tree, constraint.node, &value);
            if !outcome.is_satisfied() {
                trace!(index, ?outcome, "constraint failed");
                self.failed.push(constraints.clone());
                return false;
            }
        }
        true
    }

    fn value(&mut self) -> Option<ConstantValue> {
        let compute = &mut self.compute_value;
        self.value
            .get_or_init(|| compute.take().and_then(|f| f()))
            .clone()
    }
}

/// The two sides of an expected union, each carrying the union's own
/// constraints.
fn distribute(union: &UnionType) -> (Type, Type) {
    (
        union.left.with_added_constraints(&union.constraints),
        union.right.with_added_constraints(&union.constraints),
    )
}
