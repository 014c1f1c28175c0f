//! Module analyzers.
//!
//! One pass over a module's nodes. Each analyzer contributes `impl Analyzer`
//! methods from its own file and reports through `Analyzer::report`.
//! Problems in source are diagnostics, never errors.

mod modifiers;
mod type_check;
mod unresolved;

use std::sync::Arc;

use pkl_common::Diagnostic;
use pkl_solver::{Type, TypeContext};
use pkl_syntax::{ModuleClauseKind, ModuleId, Modifiers, NodeData, NodeIndex, NodeRef, SyntaxTree};
use tracing::debug;

use crate::context::CheckerContext;

/// Which analyzers run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AnalyzerOptions {
    pub type_check: bool,
    pub unresolved_reference: bool,
    pub modifiers: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            type_check: true,
            unresolved_reference: true,
            modifiers: true,
        }
    }
}

/// Run the enabled analyzers over `module`. Diagnostics come back ordered by
/// position.
pub fn analyze_module(
    ctx: &CheckerContext<'_>,
    module: ModuleId,
    options: &AnalyzerOptions,
) -> Vec<Diagnostic> {
    let Some(tree) = ctx.tree(module) else {
        return Vec::new();
    };
    let mut analyzer = Analyzer {
        ctx,
        tree: tree.clone(),
        module,
        diagnostics: Vec::new(),
    };
    if options.unresolved_reference {
        analyzer.check_module_clause();
    }
    for idx in tree.indices() {
        if options.modifiers {
            analyzer.check_modifiers(idx);
        }
        if options.unresolved_reference {
            analyzer.check_unresolved(idx);
        }
        if options.type_check {
            analyzer.check_value_type(idx);
        }
    }
    let mut diagnostics = analyzer.diagnostics;
    diagnostics.sort_by_key(|d| (d.span.start, d.span.end, d.severity));
    diagnostics.dedup();
    debug!(uri = tree.uri(), count = diagnostics.len(), "analyzed module");
    diagnostics
}

pub(crate) struct Analyzer<'c, 'a> {
    ctx: &'c CheckerContext<'a>,
    tree: Arc<SyntaxTree>,
    module: ModuleId,
    diagnostics: Vec<Diagnostic>,
}

/// How a property declared in an object body or an amending module relates
/// to the object it amends.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum PropertyDefinition {
    /// Not an amending position, `local`, or the amended object accepts new
    /// properties (`Dynamic`).
    Unrestricted,
    /// Overrides an inherited property.
    Overrides,
    /// Defines a new property where only `local` ones are allowed.
    NeedsLocal,
    /// Neither overrides anything nor looks like a definition.
    Unresolved,
}

impl<'c, 'a> Analyzer<'c, 'a> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    fn at(&self, idx: NodeIndex) -> NodeRef {
        NodeRef::new(self.module, idx)
    }

    fn data(&self, idx: NodeIndex) -> Option<&NodeData> {
        self.tree.data(idx)
    }

    fn property_definition(&self, idx: NodeIndex) -> PropertyDefinition {
        let Some(NodeData::Property {
            name,
            type_annotation,
            ..
        }) = self.data(idx)
        else {
            return PropertyDefinition::Unrestricted;
        };
        if self.tree.modifiers(idx).contains(Modifiers::LOCAL) {
            return PropertyDefinition::Unrestricted;
        }
        let Some(container) = self.tree.parent(idx) else {
            return PropertyDefinition::Unrestricted;
        };
        let in_body = match self.data(container) {
            Some(NodeData::ObjectBody { .. }) => true,
            Some(NodeData::Module { .. }) => {
                let amends = self
                    .tree
                    .module_clause()
                    .is_some_and(|clause| clause.kind == ModuleClauseKind::Amends);
                if !amends {
                    return PropertyDefinition::Unrestricted;
                }
                false
            }
            _ => return PropertyDefinition::Unrestricted,
        };
        if type_annotation.is_some() {
            return PropertyDefinition::NeedsLocal;
        }
        if self.ctx.overridden_property(self.at(idx)).is_some() {
            return PropertyDefinition::Overrides;
        }
        if in_body {
            let this_type = self.ctx.this_type(self.at(container));
            let dynamic = self.ctx.base().dynamic_type();
            if this_type.is_unknown() || this_type.is_subtype_of(&dynamic, self.ctx) {
                return PropertyDefinition::Unrestricted;
            }
            return PropertyDefinition::Unresolved;
        }
        if self.is_local_in_supermodules(name) {
            PropertyDefinition::NeedsLocal
        } else {
            PropertyDefinition::Unresolved
        }
    }

    /// Whether some supermodule declares `name` only as a `local` property.
    fn is_local_in_supermodules(&self, name: &str) -> bool {
        let chain = self.ctx.module_chain(self.module);
        chain.iter().skip(1).any(|&module| {
            self.ctx.tree(module).is_some_and(|tree| {
                tree.module_members().iter().any(|&member| {
                    tree.name(member) == Some(name)
                        && tree.modifiers(member).contains(Modifiers::LOCAL)
                        && matches!(tree.data(member), Some(NodeData::Property { .. }))
                })
            })
        })
    }

    /// Whether `ty` could be anything: unknown, or an unbound type variable
    /// somewhere in a union.
    fn is_indeterminate(&self, ty: &Type) -> bool {
        let ty = ty.fully_unaliased(self.ctx);
        ty.union_members()
            .into_iter()
            .any(|member| matches!(member, Type::Unknown | Type::Nothing | Type::Variable(_)))
    }
}
