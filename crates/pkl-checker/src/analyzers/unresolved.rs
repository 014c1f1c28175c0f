//! Unresolved references: accesses, types, modules and properties that
//! amend nothing.

use pkl_common::diagnostics::messages;
use pkl_common::{Diagnostic, DiagnosticSeverity};
use pkl_solver::{Type, TypeContext, TypeParameterBindings};
use pkl_syntax::{NodeData, NodeIndex};

use super::{Analyzer, PropertyDefinition};

impl Analyzer<'_, '_> {
    pub(super) fn check_module_clause(&mut self) {
        let Some(clause) = self.tree.module_clause().cloned() else {
            return;
        };
        if self.ctx.resolve_module(self.module, &clause.uri).is_none() {
            self.report(Diagnostic::from_message(
                clause.span,
                messages::UNRESOLVED_MODULE,
                &[&clause.uri],
            ));
        }
    }

    pub(super) fn check_unresolved(&mut self, idx: NodeIndex) {
        let Some(data) = self.data(idx).cloned() else {
            return;
        };
        match data {
            NodeData::UnqualifiedAccess { name, args } => {
                if self.ctx.resolve_access(self.at(idx)).is_some() {
                    return;
                }
                let this_type = self.ctx.this_type(self.at(idx));
                if this_type.is_unknown() {
                    return;
                }
                if args.is_none() && self.accepts_any_property(&this_type) {
                    return;
                }
                let severity = self.unresolved_severity(&this_type);
                self.report_access(idx, &name, args.is_some(), severity);
            }
            NodeData::QualifiedAccess {
                receiver,
                name,
                args,
                ..
            } => {
                let receiver_type = self
                    .ctx
                    .type_of_expr(self.at(receiver), &TypeParameterBindings::new())
                    .non_null(self.ctx);
                if self.is_indeterminate(&receiver_type) {
                    return;
                }
                if args.is_none() && self.accepts_any_property(&receiver_type) {
                    return;
                }
                if self.ctx.resolve_access(self.at(idx)).is_some() {
                    return;
                }
                let severity = self.unresolved_severity(&receiver_type);
                self.report_access(idx, &name, args.is_some(), severity);
            }
            NodeData::DeclaredType {
                qualifier, name, ..
            } => {
                let resolved = match &qualifier {
                    Some(qualifier) => self.ctx.resolve_qualified_type(self.at(idx), qualifier, &name),
                    None => self.ctx.resolve_type_name(self.at(idx), &name),
                };
                if resolved.is_none() {
                    let full_name = match &qualifier {
                        Some(qualifier) => format!("{qualifier}.{name}"),
                        None => name,
                    };
                    self.report(Diagnostic::from_message(
                        self.tree.span(idx),
                        messages::UNRESOLVED_TYPE,
                        &[&full_name],
                    ));
                }
            }
            NodeData::Import { uri, .. } | NodeData::ImportExpr { uri, .. } => {
                if self.ctx.resolve_module(self.module, &uri).is_none() {
                    self.report(Diagnostic::from_message(
                        self.tree.span(idx),
                        messages::UNRESOLVED_MODULE,
                        &[&uri],
                    ));
                }
            }
            NodeData::Property { name, .. } => {
                if self.property_definition(idx) == PropertyDefinition::Unresolved {
                    self.report(Diagnostic::from_message(
                        self.tree.span(idx),
                        messages::UNRESOLVED_PROPERTY,
                        &[&name],
                    ));
                }
            }
            _ => {}
        }
    }

    fn report_access(
        &mut self,
        idx: NodeIndex,
        name: &str,
        is_call: bool,
        severity: DiagnosticSeverity,
    ) {
        let message = if is_call {
            messages::UNRESOLVED_METHOD
        } else {
            messages::UNRESOLVED_PROPERTY
        };
        self.report(
            Diagnostic::from_message(self.tree.span(idx), message, &[name]).with_severity(severity),
        );
    }

    /// `Dynamic` objects take any property.
    fn accepts_any_property(&self, ty: &Type) -> bool {
        let dynamic = self.ctx.base().dynamic_type();
        !ty.is_unknown() && ty.is_subtype_of(&dynamic, self.ctx)
    }

    /// Members missing from `open` or `abstract` types are warnings.
    fn unresolved_severity(&self, ty: &Type) -> DiagnosticSeverity {
        if self.ctx.is_open_type(ty) {
            DiagnosticSeverity::Warning
        } else {
            DiagnosticSeverity::Error
        }
    }
}
