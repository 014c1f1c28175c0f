//! Diagnostics produced by the analyzers.
//!
//! The boundary format is deliberately flat: one `Vec<Diagnostic>` per module,
//! each record carrying a span, a rendered message, a severity, an optional
//! quick fix and an optional suppression group.

use crate::span::Span;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Hint,
}

/// Stable identifier of a diagnostic kind.
///
/// Each code maps to a default severity, a message template and the
/// suppression group editors use for `noinspection`-style suppression.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    TypeMismatch,
    WeakTypeMismatch,
    NullableTypeMismatch,
    ConstraintViolation,
    UnresolvedProperty,
    UnresolvedMethod,
    UnresolvedType,
    UnresolvedModule,
    MissingModifierLocal,
    ModifierNotApplicable,
    ConflictingModifiers,
    DuplicateModifier,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticMessage {
    pub code: DiagnosticCode,
    pub severity: DiagnosticSeverity,
    pub message: &'static str,
    pub group: Option<&'static str>,
}

pub mod messages {
    use super::{DiagnosticCode, DiagnosticMessage, DiagnosticSeverity};

    pub const TYPE_MISMATCH: DiagnosticMessage = DiagnosticMessage {
        code: DiagnosticCode::TypeMismatch,
        severity: DiagnosticSeverity::Error,
        message: "Type mismatch.\nRequired: {0}\nActual: {1}",
        group: Some("TypeMismatch"),
    };

    pub const WEAK_TYPE_MISMATCH: DiagnosticMessage = DiagnosticMessage {
        code: DiagnosticCode::WeakTypeMismatch,
        severity: DiagnosticSeverity::Warning,
        message: "Type mismatch.\nRequired: {0}\nActual: {1}",
        group: Some("TypeMismatch"),
    };

    pub const NULLABLE_TYPE_MISMATCH: DiagnosticMessage = DiagnosticMessage {
        code: DiagnosticCode::NullableTypeMismatch,
        severity: DiagnosticSeverity::Warning,
        message: "Type mismatch.\nRequired: {0}\nActual: {1}\nThe value may be `null`.",
        group: Some("TypeMismatch"),
    };

    pub const CONSTRAINT_VIOLATION: DiagnosticMessage = DiagnosticMessage {
        code: DiagnosticCode::ConstraintViolation,
        severity: DiagnosticSeverity::Error,
        message: "Constraint violation.\nRequired: {0}\nFound: {1}",
        group: Some("TypeMismatch"),
    };

    pub const UNRESOLVED_PROPERTY: DiagnosticMessage = DiagnosticMessage {
        code: DiagnosticCode::UnresolvedProperty,
        severity: DiagnosticSeverity::Error,
        message: "Unresolved reference: `{0}`",
        group: Some("UnresolvedElement"),
    };

    pub const UNRESOLVED_METHOD: DiagnosticMessage = DiagnosticMessage {
        code: DiagnosticCode::UnresolvedMethod,
        severity: DiagnosticSeverity::Error,
        message: "Unresolved method: `{0}`",
        group: Some("UnresolvedElement"),
    };

    pub const UNRESOLVED_TYPE: DiagnosticMessage = DiagnosticMessage {
        code: DiagnosticCode::UnresolvedType,
        severity: DiagnosticSeverity::Error,
        message: "Unresolved type: `{0}`",
        group: Some("UnresolvedElement"),
    };

    pub const UNRESOLVED_MODULE: DiagnosticMessage = DiagnosticMessage {
        code: DiagnosticCode::UnresolvedModule,
        severity: DiagnosticSeverity::Error,
        message: "Cannot resolve module `{0}`",
        group: Some("UnresolvedElement"),
    };

    pub const MISSING_MODIFIER_LOCAL: DiagnosticMessage = DiagnosticMessage {
        code: DiagnosticCode::MissingModifierLocal,
        severity: DiagnosticSeverity::Error,
        message: "Missing modifier `local`.\nModules that amend another module can only declare new properties as `local`: `{0}`",
        group: None,
    };

    pub const MODIFIER_NOT_APPLICABLE: DiagnosticMessage = DiagnosticMessage {
        code: DiagnosticCode::ModifierNotApplicable,
        severity: DiagnosticSeverity::Error,
        message: "Modifier `{0}` is not applicable to {1}",
        group: None,
    };

    pub const CONFLICTING_MODIFIERS: DiagnosticMessage = DiagnosticMessage {
        code: DiagnosticCode::ConflictingModifiers,
        severity: DiagnosticSeverity::Error,
        message: "Modifiers `{0}` and `{1}` cannot be combined",
        group: None,
    };

    pub const DUPLICATE_MODIFIER: DiagnosticMessage = DiagnosticMessage {
        code: DiagnosticCode::DuplicateModifier,
        severity: DiagnosticSeverity::Error,
        message: "Duplicate modifier `{0}`",
        group: None,
    };

    pub const ALL: &[DiagnosticMessage] = &[
        TYPE_MISMATCH,
        WEAK_TYPE_MISMATCH,
        NULLABLE_TYPE_MISMATCH,
        CONSTRAINT_VIOLATION,
        UNRESOLVED_PROPERTY,
        UNRESOLVED_METHOD,
        UNRESOLVED_TYPE,
        UNRESOLVED_MODULE,
        MISSING_MODIFIER_LOCAL,
        MODIFIER_NOT_APPLICABLE,
        CONFLICTING_MODIFIERS,
        DUPLICATE_MODIFIER,
    ];
}

/// An edit that resolves a diagnostic when applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuickFix {
    pub title: String,
    pub span: Span,
    pub replacement: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub span: Span,
    pub message: String,
    pub severity: DiagnosticSeverity,
    pub code: DiagnosticCode,
    pub fix: Option<QuickFix>,
    pub suppression_group: Option<&'static str>,
}

impl Diagnostic {
    /// Build a diagnostic from a catalogue entry, substituting `{n}` arguments.
    pub fn from_message(span: Span, message: DiagnosticMessage, args: &[&str]) -> Self {
        Self {
            span,
            message: format_message(message.message, args),
            severity: message.severity,
            code: message.code,
            fix: None,
            suppression_group: message.group,
        }
    }

    pub fn with_severity(mut self, severity: DiagnosticSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_fix(mut self, title: impl Into<String>, span: Span, replacement: impl Into<String>) -> Self {
        self.fix = Some(QuickFix {
            title: title.into(),
            span,
            replacement: replacement.into(),
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

pub fn get_message(code: DiagnosticCode) -> Option<DiagnosticMessage> {
    messages::ALL.iter().find(|m| m.code == code).copied()
}

pub fn format_message(message: &str, args: &[&str]) -> String {
    let mut result = message.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{i}}}"), arg);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_message_substitutes_positional_args() {
        let diag = Diagnostic::from_message(
            Span::new(3, 8),
            messages::TYPE_MISMATCH,
            &["String", "Int"],
        );
        assert_eq!(diag.message, "Type mismatch.\nRequired: String\nActual: Int");
        assert_eq!(diag.severity, DiagnosticSeverity::Error);
        assert_eq!(diag.suppression_group, Some("TypeMismatch"));
    }

    #[test]
    fn test_every_code_has_a_catalogue_entry() {
        for message in messages::ALL {
            assert_eq!(get_message(message.code), Some(*message));
        }
    }
}
