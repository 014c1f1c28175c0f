//! Values against their expected types.

use pkl_common::Diagnostic;
use pkl_common::diagnostics::messages;
use pkl_solver::{TypeParameterBindings, constant_value};
use pkl_syntax::{NodeData, NodeIndex};

use super::Analyzer;
use crate::type_check::TypeCheckOutcome;

impl Analyzer<'_, '_> {
    /// Check `idx` if it sits in a value position: a property value, an
    /// element, an entry value, a method body or a call argument.
    pub(super) fn check_value_type(&mut self, idx: NodeIndex) {
        if !self.is_value_position(idx) {
            return;
        }
        let expr = self.at(idx);
        let expected = self.ctx.expected_type_of(expr);
        if expected.is_unknown() {
            return;
        }
        let actual = self.ctx.type_of_expr(expr, &TypeParameterBindings::new());
        let tree = self.tree.clone();
        let outcome = self
            .ctx
            .check_type(&actual, &expected, || constant_value(&tree, idx));
        let span = self.tree.span(idx);
        let required = expected.display(self.ctx);
        let found = actual.display(self.ctx);
        let diagnostic = match outcome {
            TypeCheckOutcome::Pass => return,
            TypeCheckOutcome::TypeMismatch => {
                Diagnostic::from_message(span, messages::TYPE_MISMATCH, &[&required, &found])
            }
            TypeCheckOutcome::NullableMismatch => Diagnostic::from_message(
                span,
                messages::NULLABLE_TYPE_MISMATCH,
                &[&required, &found],
            ),
            TypeCheckOutcome::WeakMismatch => {
                Diagnostic::from_message(span, messages::WEAK_TYPE_MISMATCH, &[&required, &found])
            }
            TypeCheckOutcome::ConstraintViolation { required, found } => Diagnostic::from_message(
                span,
                messages::CONSTRAINT_VIOLATION,
                &[&required, &found],
            ),
        };
        self.report(diagnostic);
    }

    fn is_value_position(&self, idx: NodeIndex) -> bool {
        let Some(parent) = self.tree.parent(idx) else {
            return false;
        };
        match self.data(parent) {
            Some(NodeData::Property { value, .. }) => *value == Some(idx),
            Some(NodeData::Element { value }) => *value == idx,
            Some(NodeData::Entry { value, .. }) => *value == Some(idx),
            Some(NodeData::Method { body, .. }) => *body == Some(idx),
            Some(
                NodeData::UnqualifiedAccess { args: Some(args), .. }
                | NodeData::QualifiedAccess { args: Some(args), .. },
            ) => args.contains(&idx),
            _ => false,
        }
    }
}
