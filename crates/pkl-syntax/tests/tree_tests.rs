use pkl_syntax::node::import_name;
use pkl_syntax::stdlib::{BASE_MODULE_URI, base_module_tree};
use pkl_syntax::*;

fn sample_tree() -> (SyntaxTree, NodeIndex, NodeIndex) {
    let mut b = TreeBuilder::new("file:///sample.pkl", ModuleId(1));
    let string = b.declared_type("String", vec![]);
    let length = b.ident("length");
    let three = b.int(3);
    let cmp = b.binary(BinaryOp::Gt, length, three);
    let constrained = b.constrained_type(string, vec![cmp]);
    let value = b.string("hello");
    let prop = b.property(&[Modifier::Local], "name", Some(constrained), Some(value));
    let root = b.module(Some("sample"), None, vec![], vec![prop]);
    (b.finish(root), prop, cmp)
}

#[test]
fn test_finish_links_parents() {
    let (tree, prop, cmp) = sample_tree();
    assert_eq!(tree.parent(prop), Some(tree.root()));
    assert_eq!(tree.parent(tree.root()), None);

    let ancestors: Vec<_> = tree.ancestors(cmp).collect();
    assert_eq!(ancestors.last(), Some(&tree.root()));
    assert!(ancestors.contains(&prop));
}

#[test]
fn test_spans_cover_children() {
    let (tree, prop, cmp) = sample_tree();
    let prop_span = tree.span(prop);
    let cmp_span = tree.span(cmp);
    assert!(prop_span.start <= cmp_span.start && cmp_span.end <= prop_span.end);
    assert!(tree.span(tree.root()).contains(cmp_span.start));
}

#[test]
fn test_node_at_offset_finds_innermost() {
    let (tree, _, cmp) = sample_tree();
    let Some(NodeData::Binary { left, .. }) = tree.data(cmp) else {
        panic!("expected a binary node");
    };
    let offset = tree.span(*left).start;
    assert_eq!(tree.node_at_offset(offset), Some(*left));
}

#[test]
fn test_modifiers_and_names() {
    let (tree, prop, _) = sample_tree();
    assert_eq!(tree.name(prop), Some("name"));
    assert!(tree.modifiers(prop).contains(Modifiers::LOCAL));
    assert!(!tree.modifiers(prop).contains(Modifiers::HIDDEN));
    assert_eq!(tree.module_name(), Some("sample"));
}

#[test]
fn test_print_constrained_type() {
    let (tree, prop, _) = sample_tree();
    let Some(NodeData::Property {
        type_annotation: Some(annotation),
        ..
    }) = tree.data(prop)
    else {
        panic!("expected a typed property");
    };
    assert_eq!(print_node(&tree, *annotation), "String(length > 3)");
}

#[test]
fn test_print_respects_precedence() {
    let mut b = TreeBuilder::new("file:///p.pkl", ModuleId(1));
    let a = b.ident("a");
    let bb = b.ident("b");
    let c = b.ident("c");
    let sum = b.binary(BinaryOp::Add, a, bb);
    let product = b.binary(BinaryOp::Mul, sum, c);
    let x = b.ident("x");
    let y = b.ident("y");
    let z = b.ident("z");
    let diff = b.binary(BinaryOp::Sub, y, z);
    let nested = b.binary(BinaryOp::Sub, x, diff);
    let root = b.module(None, None, vec![], vec![]);
    let tree = b.finish(root);

    assert_eq!(print_node(&tree, product), "(a + b) * c");
    assert_eq!(print_node(&tree, nested), "x - (y - z)");
    assert_eq!(print_node_list(&tree, &[a, c], " or "), "a or c");
}

#[test]
fn test_print_types() {
    let mut b = TreeBuilder::new("file:///p.pkl", ModuleId(1));
    let int = b.declared_type("Int", vec![]);
    let string = b.declared_type("String", vec![]);
    let fun = b.function_type(vec![int, string], string);
    let listing = b.declared_type("Listing", vec![int]);
    let nullable = b.nullable_type(listing);
    let literal = b.string_literal_type("a\"b");
    let root = b.module(None, None, vec![], vec![]);
    let tree = b.finish(root);

    assert_eq!(print_node(&tree, fun), "(Int, String) -> String");
    assert_eq!(print_node(&tree, nullable), "Listing<Int>?");
    assert_eq!(print_node(&tree, literal), "\"a\\\"b\"");
}

#[test]
fn test_import_names() {
    assert_eq!(import_name("pkl:math"), "math");
    assert_eq!(import_name("../shared/config.pkl"), "config");
    assert_eq!(import_name("@deps/util/strings.pkl"), "strings");
    assert_eq!(import_name("package://example.com/lib@1.0.0#/base.pkl"), "base");
}

#[test]
fn test_base_module_declares_core_classes() {
    let tree = base_module_tree();
    assert_eq!(tree.uri(), BASE_MODULE_URI);
    assert_eq!(tree.module_id(), ModuleId::BASE);

    for name in ["Any", "Null", "String", "Int", "Listing", "Mapping", "Function2", "Module"] {
        assert!(tree.find_type_decl(name).is_some(), "missing {name}");
    }

    let string = tree.find_type_decl("String").expect("String");
    assert!(tree.find_member(string, "length", false).is_some());
    assert!(tree.find_member(string, "startsWith", true).is_some());
    assert!(tree.find_member(string, "startsWith", false).is_none());

    let listing = tree.find_type_decl("Listing").expect("Listing");
    let Some(NodeData::Class { type_params, .. }) = tree.data(listing) else {
        panic!("Listing is a class");
    };
    assert!(matches!(
        tree.data(type_params[0]),
        Some(NodeData::TypeParameter {
            variance: Variance::Out,
            ..
        })
    ));
}

#[test]
fn test_base_aliases_render_with_constraints() {
    let tree = base_module_tree();
    let uint8 = tree.find_type_decl("UInt8").expect("UInt8");
    let Some(NodeData::TypeAlias { aliased, .. }) = tree.data(uint8) else {
        panic!("UInt8 is an alias");
    };
    assert_eq!(print_node(&tree, *aliased), "Int(isBetween(0, 255))");

    let mixin = tree.find_type_decl("Mixin").expect("Mixin");
    let Some(NodeData::TypeAlias { aliased, .. }) = tree.data(mixin) else {
        panic!("Mixin is an alias");
    };
    assert_eq!(print_node(&tree, *aliased), "(Type) -> Type");
}
