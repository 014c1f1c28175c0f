//! Tests for the workspace: module lifecycle, cross-module resolution and
//! cached diagnostics.

mod support;

use std::sync::Arc;
use std::thread;

use pkl_common::DiagnosticCode;
use pkl_lsp::{AnalyzerSettings, ServerSettings};
use pkl_syntax::{ModuleId, TreeBuilder};
use support::{codes, messages, workspace};

const MAIN: &str = "file:///ws/main.pkl";
const LIB: &str = "file:///ws/lib.pkl";
const OTHER: &str = "file:///ws/other.pkl";

fn open_lib(ws: &pkl_lsp::Workspace, with_foo: bool) {
    ws.open_with(LIB, |b| {
        let members = if with_foo {
            vec![b.class(&[], "Foo", vec![], None, vec![])]
        } else {
            vec![b.class(&[], "Bar", vec![], None, vec![])]
        };
        b.module(Some("lib"), None, vec![], members)
    })
    .unwrap();
}

/// `import "lib.pkl"` and a property typed `lib.Foo`.
fn open_main(ws: &pkl_lsp::Workspace) {
    ws.open_with(MAIN, |b| {
        let import = b.import("lib.pkl", None);
        let ty = b.qualified_type("lib", "Foo", vec![]);
        let foo = b.property(&[], "foo", Some(ty), None);
        b.module(Some("main"), None, vec![import], vec![foo])
    })
    .unwrap();
}

fn open_unresolved(ws: &pkl_lsp::Workspace, uri: &str) {
    ws.open_with(uri, |b| {
        let bogus = b.ident("bogus");
        let prop = b.property(&[], "prop", None, Some(bogus));
        b.module(Some("m"), None, vec![], vec![prop])
    })
    .unwrap();
}

#[test]
fn test_module_ids_are_stable() {
    let ws = workspace();
    let id = ws.module_id(MAIN);
    assert_ne!(id, ModuleId::BASE);
    assert_eq!(ws.module_id(MAIN), id);
    assert_ne!(ws.module_id(LIB), id);
    assert_eq!(ws.open_module_id(MAIN), None);

    open_main(&ws);
    assert_eq!(ws.open_module_id(MAIN), Some(id));
    assert!(ws.close_module(MAIN));
    assert!(!ws.close_module(MAIN));
    assert_eq!(ws.open_module_id(MAIN), None);
    open_main(&ws);
    assert_eq!(ws.open_module_id(MAIN), Some(id));
}

#[test]
fn test_tree_built_with_wrong_id_is_rejected() {
    let ws = workspace();
    let mut b = TreeBuilder::new(MAIN, ModuleId(999));
    let root = b.module(Some("main"), None, vec![], vec![]);
    let err = ws.update_module(b.finish(root)).unwrap_err();
    assert!(err.to_string().contains(MAIN), "{err}");
    assert!(ws.tree(MAIN).is_none());
}

#[test]
fn test_relative_import_resolves_to_open_module() {
    let ws = workspace();
    open_lib(&ws, true);
    open_main(&ws);
    assert!(ws.diagnostics(MAIN).is_empty(), "{:?}", ws.diagnostics(MAIN));
}

#[test]
fn test_diagnostics_are_served_from_cache() {
    let ws = workspace();
    open_unresolved(&ws, MAIN);
    let first = ws.diagnostics(MAIN);
    assert_eq!(codes(&first), vec![DiagnosticCode::UnresolvedProperty]);
    let second = ws.diagnostics(MAIN);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(ws.diagnostics_computed(), 1);
    assert_eq!(ws.cache_stats().hits, 1);
}

#[test]
fn test_concurrent_readers_share_one_computation() {
    let ws = workspace();
    open_unresolved(&ws, MAIN);
    let expected = ws.diagnostics(MAIN);

    thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..20 {
                    assert_eq!(ws.diagnostics(MAIN), expected);
                }
            });
        }
    });
    assert_eq!(ws.diagnostics_computed(), 1);
}

#[test]
fn test_editing_a_dependency_recomputes() {
    let ws = workspace();
    open_lib(&ws, true);
    open_main(&ws);
    assert!(ws.diagnostics(MAIN).is_empty());
    assert_eq!(ws.diagnostics_computed(), 1);

    open_lib(&ws, false);
    let diagnostics = ws.diagnostics(MAIN);
    assert_eq!(ws.diagnostics_computed(), 2);
    assert_eq!(messages(&diagnostics), vec!["Unresolved type: `lib.Foo`"]);
}

#[test]
fn test_editing_an_unrelated_module_keeps_the_cache() {
    let ws = workspace();
    open_unresolved(&ws, MAIN);
    open_unresolved(&ws, OTHER);
    ws.diagnostics(MAIN);
    open_unresolved(&ws, OTHER);
    ws.diagnostics(MAIN);
    assert_eq!(ws.diagnostics_computed(), 1);
}

#[test]
fn test_opening_an_imported_module_recomputes() {
    let ws = workspace();
    open_main(&ws);
    assert_eq!(
        messages(&ws.diagnostics(MAIN)),
        vec!["Cannot resolve module `lib.pkl`", "Unresolved type: `lib.Foo`"]
    );
    open_lib(&ws, true);
    assert!(ws.diagnostics(MAIN).is_empty());
    assert_eq!(ws.diagnostics_computed(), 2);
}

#[test]
fn test_closed_module_has_no_diagnostics() {
    let ws = workspace();
    open_unresolved(&ws, MAIN);
    assert_eq!(ws.diagnostics(MAIN).len(), 1);
    ws.close_module(MAIN);
    assert!(ws.diagnostics(MAIN).is_empty());
}

#[test]
fn test_settings_change_recomputes_with_new_options() {
    let ws = workspace();
    open_unresolved(&ws, MAIN);
    assert_eq!(ws.diagnostics(MAIN).len(), 1);

    ws.update_settings(ServerSettings {
        analyzers: AnalyzerSettings {
            unresolved_reference: false,
            ..AnalyzerSettings::default()
        },
        ..ServerSettings::default()
    });
    assert!(ws.diagnostics(MAIN).is_empty());
    assert_eq!(ws.diagnostics_computed(), 2);
}

#[test]
fn test_diagnostics_for_all_in_parallel() {
    let ws = workspace();
    ws.update_settings(ServerSettings {
        parallelism: Some(2),
        ..ServerSettings::default()
    });
    open_unresolved(&ws, OTHER);
    open_lib(&ws, true);
    open_main(&ws);

    let all = ws.diagnostics_for_all();
    let uris: Vec<&str> = all.iter().map(|(uri, _)| uri.as_str()).collect();
    assert_eq!(uris, vec![LIB, MAIN, OTHER]);
    assert!(all[0].1.is_empty());
    assert!(all[1].1.is_empty());
    assert_eq!(codes(&all[2].1), vec![DiagnosticCode::UnresolvedProperty]);
    assert_eq!(ws.diagnostics_computed(), 3);

    ws.diagnostics_for_all();
    assert_eq!(ws.diagnostics_computed(), 3);
}
