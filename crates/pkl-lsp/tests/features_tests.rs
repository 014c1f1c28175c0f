//! Tests for the completion, definition and hover entry points.

mod support;

use pkl_checker::CompletionKind;
use pkl_lsp::Workspace;
use pkl_syntax::NodeIndex;
use support::{offset_of, workspace};

const MAIN: &str = "file:///ws/main.pkl";
const LIB: &str = "file:///ws/lib.pkl";

struct Sites {
    person_type: NodeIndex,
    receiver: NodeIndex,
    access: NodeIndex,
    name_prop: NodeIndex,
    bare: NodeIndex,
    import: NodeIndex,
}

/// ```pkl
/// import "lib.pkl"
/// class Person { name: String }
/// person: Person
/// greeting = person.name
/// other = greeting
/// ```
fn open_fixture(ws: &Workspace) -> Sites {
    ws.open_with(LIB, |b| {
        let one = b.int(1);
        let version = b.property(&[], "version", None, Some(one));
        b.module(Some("lib"), None, vec![], vec![version])
    })
    .unwrap();

    let mut sites = Sites {
        person_type: NodeIndex::NONE,
        receiver: NodeIndex::NONE,
        access: NodeIndex::NONE,
        name_prop: NodeIndex::NONE,
        bare: NodeIndex::NONE,
        import: NodeIndex::NONE,
    };
    ws.open_with(MAIN, |b| {
        sites.import = b.import("lib.pkl", None);
        let string = b.declared_type("String", vec![]);
        sites.name_prop = b.property(&[], "name", Some(string), None);
        let class = b.class(&[], "Person", vec![], None, vec![sites.name_prop]);
        sites.person_type = b.declared_type("Person", vec![]);
        let person = b.property(&[], "person", Some(sites.person_type), None);
        sites.receiver = b.ident("person");
        sites.access = b.member(sites.receiver, "name");
        let greeting = b.property(&[], "greeting", None, Some(sites.access));
        sites.bare = b.ident("greeting");
        let other = b.property(&[], "other", None, Some(sites.bare));
        b.module(
            Some("main"),
            None,
            vec![sites.import],
            vec![class, person, greeting, other],
        )
    })
    .unwrap();
    sites
}

#[test]
fn test_member_completion_after_dot() {
    let ws = workspace();
    let sites = open_fixture(&ws);
    let tree = ws.tree(MAIN).unwrap();
    let items = ws.completion(MAIN, offset_of(&tree, sites.access));
    let name = items
        .iter()
        .find(|item| item.label == "name")
        .expect("Person.name is offered");
    assert_eq!(name.kind, CompletionKind::Property);
    assert_eq!(name.detail, "String");
    assert!(items.iter().all(|item| item.label != "greeting"));
}

#[test]
fn test_unqualified_completion_sees_module_members() {
    let ws = workspace();
    let sites = open_fixture(&ws);
    let tree = ws.tree(MAIN).unwrap();
    let items = ws.completion(MAIN, offset_of(&tree, sites.bare));
    for label in ["person", "greeting", "other", "lib", "NaN"] {
        assert!(items.iter().any(|item| item.label == label), "missing {label}");
    }
}

#[test]
fn test_type_completion_in_annotation() {
    let ws = workspace();
    let sites = open_fixture(&ws);
    let tree = ws.tree(MAIN).unwrap();
    let items = ws.completion(MAIN, offset_of(&tree, sites.person_type));
    assert!(
        items
            .iter()
            .any(|item| item.label == "Person" && item.kind == CompletionKind::Class)
    );
    assert!(items.iter().all(|item| item.label != "greeting"));
}

#[test]
fn test_completion_outside_any_module_is_empty() {
    let ws = workspace();
    assert!(ws.completion(MAIN, 0).is_empty());
    open_fixture(&ws);
    assert!(ws.completion(MAIN, 10_000).is_empty());
}

#[test]
fn test_definition_of_member_access() {
    let ws = workspace();
    let sites = open_fixture(&ws);
    let tree = ws.tree(MAIN).unwrap();
    let location = ws
        .definition(MAIN, offset_of(&tree, sites.access))
        .expect("person.name resolves");
    assert_eq!(location.uri, MAIN);
    assert_eq!(location.span, tree.span(sites.name_prop));
}

#[test]
fn test_definition_of_type_name() {
    let ws = workspace();
    let sites = open_fixture(&ws);
    let tree = ws.tree(MAIN).unwrap();
    let class = tree.find_type_decl("Person").unwrap();
    let location = ws
        .definition(MAIN, offset_of(&tree, sites.person_type))
        .expect("Person resolves");
    assert_eq!(location.span, tree.span(class));
}

#[test]
fn test_definition_of_import_is_the_imported_module() {
    let ws = workspace();
    let sites = open_fixture(&ws);
    let tree = ws.tree(MAIN).unwrap();
    let lib = ws.tree(LIB).unwrap();
    let location = ws
        .definition(MAIN, offset_of(&tree, sites.import))
        .expect("import resolves");
    assert_eq!(location.uri, LIB);
    assert_eq!(location.span, lib.span(lib.root()));
}

#[test]
fn test_definition_of_standard_library_member() {
    let ws = workspace();
    let mut access = NodeIndex::NONE;
    ws.open_with(MAIN, |b| {
        access = b.ident("NaN");
        let prop = b.property(&[], "prop", None, Some(access));
        b.module(Some("main"), None, vec![], vec![prop])
    })
    .unwrap();
    let tree = ws.tree(MAIN).unwrap();
    let location = ws.definition(MAIN, offset_of(&tree, access)).unwrap();
    assert_eq!(location.uri, "pkl:base");
}

#[test]
fn test_hover_shows_types() {
    let ws = workspace();
    let sites = open_fixture(&ws);
    let tree = ws.tree(MAIN).unwrap();

    let hover = ws.hover(MAIN, offset_of(&tree, sites.access)).unwrap();
    assert_eq!(hover.contents, "String");
    assert_eq!(hover.span, tree.span(sites.access));

    let hover = ws.hover(MAIN, offset_of(&tree, sites.bare)).unwrap();
    assert_eq!(hover.contents, "String");

    let hover = ws.hover(MAIN, offset_of(&tree, sites.name_prop)).unwrap();
    assert_eq!(hover.contents, "property name: String");

    let class = tree.find_type_decl("Person").unwrap();
    let hover = ws.hover(MAIN, offset_of(&tree, class)).unwrap();
    assert_eq!(hover.contents, "class Person");

    let hover = ws.hover(MAIN, offset_of(&tree, sites.person_type)).unwrap();
    assert_eq!(hover.contents, "Person");
}
