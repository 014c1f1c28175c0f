//! Shared fixtures for workspace-level tests.
#![allow(dead_code)]

use pkl_common::{Diagnostic, DiagnosticCode};
use pkl_lsp::{ServerSettings, Workspace};
use pkl_syntax::{NodeIndex, SyntaxTree};

pub fn workspace() -> Workspace {
    Workspace::new(ServerSettings::default()).expect("bundled base module is complete")
}

/// An offset that lands on `node` itself rather than on one of its
/// children: a node's own synthetic byte comes after its children's.
pub fn offset_of(tree: &SyntaxTree, node: NodeIndex) -> u32 {
    tree.span(node).end - 1
}

pub fn codes(diagnostics: &[Diagnostic]) -> Vec<DiagnosticCode> {
    diagnostics.iter().map(|d| d.code).collect()
}

pub fn messages(diagnostics: &[Diagnostic]) -> Vec<String> {
    diagnostics.iter().map(|d| d.message.clone()).collect()
}
