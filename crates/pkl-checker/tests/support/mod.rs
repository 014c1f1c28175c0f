//! Shared fixture: a set of hand-built modules over the bundled base
//! module, acting as the checker's `ModuleProvider`.
#![allow(dead_code)]

use std::sync::Arc;

use pkl_checker::{AnalyzerOptions, CheckerContext, ModuleProvider, analyze_module};
use pkl_common::{Diagnostic, DiagnosticCode};
use pkl_solver::Base;
use pkl_syntax::stdlib::base_module_tree;
use pkl_syntax::{ModuleId, NodeIndex, NodeRef, SyntaxTree, TreeBuilder};

pub struct TestWorkspace {
    base: Base,
    trees: Vec<Arc<SyntaxTree>>,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let base_tree = Arc::new(base_module_tree());
        let base = Base::new(base_tree.clone()).expect("bundled base module is complete");
        Self {
            base,
            trees: vec![base_tree],
        }
    }

    /// Build and register a module. `build` returns the module root.
    pub fn module(
        &mut self,
        uri: &str,
        build: impl FnOnce(&mut TreeBuilder) -> NodeIndex,
    ) -> ModuleId {
        let id = ModuleId(self.trees.len() as u32);
        let mut builder = TreeBuilder::new(uri, id);
        let root = build(&mut builder);
        self.trees.push(Arc::new(builder.finish(root)));
        id
    }

    pub fn ctx(&self) -> CheckerContext<'_> {
        CheckerContext::new(self, &self.base)
    }

    pub fn tree(&self, module: ModuleId) -> Arc<SyntaxTree> {
        self.trees[module.0 as usize].clone()
    }

    /// First node in `module` that declares `name`.
    pub fn decl(&self, module: ModuleId, name: &str) -> NodeRef {
        let tree = self.tree(module);
        tree.indices()
            .find(|&idx| tree.name(idx) == Some(name))
            .map(|idx| tree.node_ref(idx))
            .unwrap_or_else(|| panic!("no declaration named {name}"))
    }

    pub fn diagnostics(&self, module: ModuleId) -> Vec<Diagnostic> {
        analyze_module(&self.ctx(), module, &AnalyzerOptions::default())
    }

    pub fn diagnostics_with(&self, module: ModuleId, options: AnalyzerOptions) -> Vec<Diagnostic> {
        analyze_module(&self.ctx(), module, &options)
    }
}

impl ModuleProvider for TestWorkspace {
    fn module_tree(&self, module: ModuleId) -> Option<Arc<SyntaxTree>> {
        self.trees.get(module.0 as usize).cloned()
    }

    fn resolve_module(&self, _from: ModuleId, uri: &str) -> Option<ModuleId> {
        self.trees
            .iter()
            .find(|tree| tree.uri() == uri)
            .map(|tree| tree.module_id())
    }
}

pub fn codes(diagnostics: &[Diagnostic]) -> Vec<DiagnosticCode> {
    diagnostics.iter().map(|d| d.code).collect()
}

pub fn at(module: ModuleId, idx: NodeIndex) -> NodeRef {
    NodeRef::new(module, idx)
}
