//! Modifier checks: applicability, duplicates, conflicts and missing `local`.

use pkl_common::diagnostics::messages;
use pkl_common::{Diagnostic, Span};
use pkl_syntax::{Modifier, Modifiers, NodeData, NodeIndex};

use super::{Analyzer, PropertyDefinition};

/// Modifiers accepted by each kind of declaration.
fn applicable_modifiers(data: &NodeData, in_object_body: bool) -> Modifiers {
    match data {
        NodeData::Module { .. } => Modifiers::ABSTRACT | Modifiers::OPEN,
        NodeData::Class { .. } => {
            Modifiers::ABSTRACT | Modifiers::OPEN | Modifiers::EXTERNAL | Modifiers::LOCAL
        }
        NodeData::TypeAlias { .. } => Modifiers::EXTERNAL | Modifiers::LOCAL,
        NodeData::Property { .. } if in_object_body => Modifiers::LOCAL,
        NodeData::Property { .. } => {
            Modifiers::ABSTRACT
                | Modifiers::EXTERNAL
                | Modifiers::HIDDEN
                | Modifiers::FIXED
                | Modifiers::CONST
                | Modifiers::LOCAL
        }
        NodeData::Method { .. } if in_object_body => Modifiers::LOCAL,
        NodeData::Method { .. } => {
            Modifiers::ABSTRACT | Modifiers::EXTERNAL | Modifiers::CONST | Modifiers::LOCAL
        }
        _ => Modifiers::empty(),
    }
}

/// Pairs that cannot appear on the same declaration.
const CONFLICTS: &[(Modifier, Modifier)] = &[(Modifier::Abstract, Modifier::Open)];

impl Analyzer<'_, '_> {
    pub(super) fn check_modifiers(&mut self, idx: NodeIndex) {
        let Some(data) = self.data(idx).cloned() else {
            return;
        };
        let tokens = data.modifier_tokens();
        if !tokens.is_empty() {
            let in_object_body = self
                .tree
                .parent(idx)
                .is_some_and(|parent| matches!(self.data(parent), Some(NodeData::ObjectBody { .. })));
            let applicable = applicable_modifiers(&data, in_object_body);
            let mut seen = Modifiers::empty();
            for token in tokens {
                let flag = token.modifier.flag();
                let keyword = token.modifier.as_str();
                if seen.contains(flag) {
                    self.report(Diagnostic::from_message(
                        token.span,
                        messages::DUPLICATE_MODIFIER,
                        &[keyword],
                    ));
                    continue;
                }
                if !applicable.contains(flag) {
                    self.report(Diagnostic::from_message(
                        token.span,
                        messages::MODIFIER_NOT_APPLICABLE,
                        &[keyword, data.kind_name()],
                    ));
                }
                for &(first, second) in CONFLICTS {
                    let other = if token.modifier == second {
                        first
                    } else if token.modifier == first {
                        second
                    } else {
                        continue;
                    };
                    if seen.contains(other.flag()) {
                        self.report(Diagnostic::from_message(
                            token.span,
                            messages::CONFLICTING_MODIFIERS,
                            &[other.as_str(), keyword],
                        ));
                    }
                }
                seen |= flag;
            }
        }
        if let NodeData::Property { name, .. } = &data
            && self.property_definition(idx) == PropertyDefinition::NeedsLocal
        {
            let span = self.tree.span(idx);
            let at_start = Span::new(span.start, span.start);
            self.report(
                Diagnostic::from_message(span, messages::MISSING_MODIFIER_LOCAL, &[name])
                    .with_fix("Add modifier `local`", at_start, "local "),
            );
        }
    }
}
