//! Tests for `PklProject` loading and dependency resolution through the
//! workspace.

mod support;

use std::fs;
use std::path::Path;

use pkl_lsp::{DependencyTarget, PackageUri, ProjectDescriptor, Version, file_uri};
use pkl_lsp::project::{DEPS_FILE, PROJECT_FILE, find_project_dir};
use support::{messages, workspace};

const PROJECT: &str = r#"{
  "dependencies": {
    "lib": { "uri": "package://example.com/lib@1.2.3" },
    "shared": { "uri": "package://example.com/shared@2.0.0" }
  }
}"#;

const LOCK: &str = r#"{
  "schemaVersion": 1,
  "resolvedDependencies": {
    "package://example.com/lib@1": {
      "type": "remote",
      "uri": "package://example.com/lib@1.4.0",
      "checksums": { "sha256": "abc123" }
    },
    "package://example.com/shared@2": {
      "type": "local",
      "uri": "package://example.com/shared@2.0.0",
      "path": "../shared"
    }
  }
}"#;

fn write_project(dir: &Path, project: &str, lock: Option<&str>) {
    fs::write(dir.join(PROJECT_FILE), project).unwrap();
    if let Some(lock) = lock {
        fs::write(dir.join(DEPS_FILE), lock).unwrap();
    }
}

#[test]
fn test_package_uri_parsing() {
    let uri = PackageUri::parse("package://example.com/lib@1.2.3#/types.pkl").unwrap();
    assert_eq!(uri.name, "example.com/lib");
    assert_eq!(
        uri.version,
        Version {
            major: 1,
            minor: 2,
            patch: 3
        }
    );
    assert_eq!(uri.lock_key(), "package://example.com/lib@1");
    assert_eq!(uri.to_string(), "package://example.com/lib@1.2.3");
    assert_eq!(uri.module_uri("/a/b.pkl"), "package://example.com/lib@1.2.3#/a/b.pkl");

    assert!(PackageUri::parse("package://example.com/lib").is_err());
    assert!(PackageUri::parse("package://example.com/lib@one").is_err());
    assert!(PackageUri::parse("https://example.com/lib@1.0.0").is_err());
    assert_eq!(Version::parse("1.2.3-rc.1").map(|v| v.patch), Some(3));
}

#[test]
fn test_locked_versions_win_over_declared_ones() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path(), PROJECT, Some(LOCK));
    let project = ProjectDescriptor::load(dir.path()).unwrap();

    assert_eq!(project.dependency_names(), vec!["lib", "shared"]);
    match project.dependency("lib") {
        Some(DependencyTarget::Package { package, checksums }) => {
            assert_eq!(package.to_string(), "package://example.com/lib@1.4.0");
            assert_eq!(checksums.as_ref().map(|c| c.sha256.as_str()), Some("abc123"));
        }
        other => panic!("unexpected target {other:?}"),
    }
    assert_eq!(
        project.dependency("shared"),
        Some(&DependencyTarget::Local {
            dir: dir.path().join("../shared")
        })
    );
    assert_eq!(project.dependency("missing"), None);
}

#[test]
fn test_without_lock_file_declared_versions_are_used() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path(), PROJECT, None);
    let project = ProjectDescriptor::load(dir.path()).unwrap();
    match project.dependency("lib") {
        Some(DependencyTarget::Package { package, checksums }) => {
            assert_eq!(package.to_string(), "package://example.com/lib@1.2.3");
            assert!(checksums.is_none());
        }
        other => panic!("unexpected target {other:?}"),
    }
}

#[test]
fn test_dependency_missing_from_lock_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let lock = r#"{"schemaVersion": 1, "resolvedDependencies": {}}"#;
    write_project(dir.path(), PROJECT, Some(lock));
    let project = ProjectDescriptor::load(dir.path()).unwrap();
    assert!(project.dependency_names().is_empty());
}

#[test]
fn test_load_errors_name_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = ProjectDescriptor::load(dir.path()).unwrap_err();
    assert!(format!("{err:#}").contains(PROJECT_FILE), "{err:#}");

    write_project(dir.path(), "{ not json", None);
    let err = ProjectDescriptor::load(dir.path()).unwrap_err();
    assert!(format!("{err:#}").contains("failed to parse"), "{err:#}");

    let lock = r#"{"schemaVersion": 7, "resolvedDependencies": {}}"#;
    write_project(dir.path(), PROJECT, Some(lock));
    let err = ProjectDescriptor::load(dir.path()).unwrap_err();
    assert!(format!("{err:#}").contains("unsupported schema version 7"), "{err:#}");
}

#[test]
fn test_find_project_dir_walks_up() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path(), PROJECT, None);
    let nested = dir.path().join("a/b");
    fs::create_dir_all(&nested).unwrap();
    assert_eq!(find_project_dir(&nested), Some(dir.path().to_path_buf()));
}

// =============================================================================
// Through the workspace
// =============================================================================

const TYPES_URI: &str = "package://example.com/lib@1.4.0#/types.pkl";

/// A project whose main module imports `@lib/types.pkl` and uses
/// `types.Foo`. Returns the main module's URI.
fn project_workspace(ws: &pkl_lsp::Workspace, dir: &Path) -> String {
    write_project(dir, PROJECT, Some(LOCK));
    ws.add_project(dir);
    ws.open_with(TYPES_URI, |b| {
        let foo = b.class(&[], "Foo", vec![], None, vec![]);
        b.module(Some("types"), None, vec![], vec![foo])
    })
    .unwrap();
    let main = file_uri(&dir.join("main.pkl"));
    ws.open_with(&main, |b| {
        let import = b.import("@lib/types.pkl", None);
        let ty = b.qualified_type("types", "Foo", vec![]);
        let foo = b.property(&[], "foo", Some(ty), None);
        b.module(Some("main"), None, vec![import], vec![foo])
    })
    .unwrap();
    main
}

#[test]
fn test_dependency_notation_resolves_through_project() {
    let ws = workspace();
    let dir = tempfile::tempdir().unwrap();
    let main = project_workspace(&ws, dir.path());
    assert!(ws.diagnostics(&main).is_empty(), "{:?}", ws.diagnostics(&main));
    assert_eq!(ws.projects_loaded(), 1);
}

#[test]
fn test_project_is_reloaded_after_package_download() {
    let ws = workspace();
    let dir = tempfile::tempdir().unwrap();
    let main = project_workspace(&ws, dir.path());
    ws.diagnostics(&main);
    ws.diagnostics(&main);
    assert_eq!(ws.projects_loaded(), 1);
    assert_eq!(ws.diagnostics_computed(), 1);

    ws.package_downloaded();
    ws.diagnostics(&main);
    assert_eq!(ws.projects_loaded(), 2);
    assert_eq!(ws.diagnostics_computed(), 2);
}

#[test]
fn test_project_sync_picks_up_new_lock_file() {
    let ws = workspace();
    let dir = tempfile::tempdir().unwrap();
    let main = project_workspace(&ws, dir.path());
    assert!(ws.diagnostics(&main).is_empty());

    // The lock now pins a version nobody has opened.
    fs::write(
        dir.path().join(DEPS_FILE),
        LOCK.replace("lib@1.4.0", "lib@1.5.0"),
    )
    .unwrap();
    assert!(ws.diagnostics(&main).is_empty(), "nothing changes before a sync");

    ws.sync_projects();
    assert_eq!(
        messages(&ws.diagnostics(&main)),
        vec!["Cannot resolve module `@lib/types.pkl`", "Unresolved type: `types.Foo`"]
    );
}

#[test]
fn test_broken_project_is_remembered_until_sync() {
    let ws = workspace();
    let dir = tempfile::tempdir().unwrap();
    ws.add_project(dir.path());
    assert!(ws.project(dir.path()).is_none());
    assert!(ws.project(dir.path()).is_none());
    assert_eq!(ws.projects_loaded(), 1);

    write_project(dir.path(), PROJECT, None);
    ws.sync_projects();
    assert!(ws.project(dir.path()).is_some());
    assert_eq!(ws.projects_loaded(), 2);
}
