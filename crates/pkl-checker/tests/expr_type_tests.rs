//! Tests for expression types, inference and flow narrowing.

mod support;

use pkl_solver::{Type, TypeContext, TypeParameterBindings};
use pkl_syntax::{BinaryOp, ModuleId, NodeIndex, TreeBuilder};
use support::{TestWorkspace, at};

/// A module whose only property is `prop = <value>`, plus any extra members.
fn value_module(
    ws: &mut TestWorkspace,
    build: impl FnOnce(&mut TreeBuilder, &mut Vec<NodeIndex>) -> NodeIndex,
) -> (ModuleId, NodeIndex) {
    let mut value = NodeIndex::NONE;
    let module = ws.module("file:///test.pkl", |b| {
        let mut members = Vec::new();
        value = build(b, &mut members);
        members.push(b.property(&[], "prop", None, Some(value)));
        b.module(Some("test"), None, vec![], members)
    });
    (module, value)
}

fn type_of(ws: &TestWorkspace, module: ModuleId, node: NodeIndex) -> Type {
    ws.ctx().type_of_expr(at(module, node), &TypeParameterBindings::new())
}

/// `name: <Type>?` with no value.
fn nullable_property(b: &mut TreeBuilder, name: &str, type_name: &str) -> NodeIndex {
    let ty = b.declared_type(type_name, vec![]);
    let nullable = b.nullable_type(ty);
    b.property(&[], name, Some(nullable), None)
}

/// Build one property per case and check each value's rendered type.
fn assert_value_types(build: impl FnOnce(&mut TreeBuilder) -> Vec<(NodeIndex, &'static str)>) {
    let mut ws = TestWorkspace::new();
    let mut cases = Vec::new();
    let module = ws.module("file:///test.pkl", |b| {
        cases = build(b);
        let members = cases
            .iter()
            .enumerate()
            .map(|(i, &(value, _))| b.property(&[], &format!("p{i}"), None, Some(value)))
            .collect();
        b.module(Some("test"), None, vec![], members)
    });
    let ctx = ws.ctx();
    for (value, expected) in cases {
        let ty = ctx.type_of_expr(at(module, value), &TypeParameterBindings::new());
        assert_eq!(ty.display(&ctx), expected);
    }
}

#[test]
fn test_literal_types() {
    assert_value_types(|b| {
        vec![
            (b.int(1), "Int"),
            (b.float(1.5), "Float"),
            (b.boolean(true), "Boolean"),
            (b.null(), "Null"),
            (b.string("hi"), "\"hi\""),
        ]
    });
}

#[test]
fn test_arithmetic_types() {
    assert_value_types(|b| {
        let mut cases = Vec::new();
        let (l, r) = (b.int(1), b.int(2));
        cases.push((b.binary(BinaryOp::Add, l, r), "Int"));
        let (l, r) = (b.int(1), b.float(2.0));
        cases.push((b.binary(BinaryOp::Add, l, r), "Float"));
        let (l, r) = (b.int(1), b.int(2));
        cases.push((b.binary(BinaryOp::Div, l, r), "Float"));
        let (l, r) = (b.int(7), b.int(2));
        cases.push((b.binary(BinaryOp::IntDiv, l, r), "Int"));
        let (l, r) = (b.string("a"), b.string("b"));
        cases.push((b.binary(BinaryOp::Add, l, r), "String"));
        let (l, r) = (b.int(1), b.int(2));
        cases.push((b.binary(BinaryOp::Lt, l, r), "Boolean"));
        cases
    });
}

#[test]
fn test_type_cast_uses_target_type() {
    let mut ws = TestWorkspace::new();
    let (module, value) = value_module(&mut ws, |b, _| {
        let one = b.int(1);
        let number = b.declared_type("Number", vec![]);
        b.as_type(one, number)
    });
    assert_eq!(type_of(&ws, module, value), ws.ctx().base().number_type());
}

#[test]
fn test_generic_method_call_infers_type_arguments() {
    let mut ws = TestWorkspace::new();
    let mut call = NodeIndex::NONE;
    let (module, first) = value_module(&mut ws, |b, _| {
        let one = b.int(1);
        let two = b.int(2);
        call = b.call("Pair", vec![one, two]);
        b.member(call, "first")
    });
    let ctx = ws.ctx();
    let base = ctx.base();
    let pair = ctx.type_of_expr(at(module, call), &TypeParameterBindings::new());
    assert_eq!(pair.class_decl(), Some(base.pair));
    assert_eq!(pair.type_args(), &[base.int_type(), base.int_type()]);
    assert_eq!(
        ctx.type_of_expr(at(module, first), &TypeParameterBindings::new()),
        base.int_type()
    );
}

#[test]
fn test_lambda_parameter_typed_from_expected_function() {
    let mut ws = TestWorkspace::new();
    let mut body = NodeIndex::NONE;
    let (module, call) = value_module(&mut ws, |b, members| {
        let int = b.declared_type("Int", vec![]);
        let list_type = b.declared_type("List", vec![int]);
        members.push(b.property(&[], "list", Some(list_type), None));
        let e = b.param("e", None);
        body = b.ident("e");
        let lambda = b.lambda(vec![e], body);
        let receiver = b.ident("list");
        b.method_call(receiver, "map", vec![lambda])
    });
    let ctx = ws.ctx();
    assert_eq!(
        ctx.type_of_expr(at(module, body), &TypeParameterBindings::new()),
        ctx.base().int_type()
    );
    let mapped = ctx.type_of_expr(at(module, call), &TypeParameterBindings::new());
    assert_eq!(mapped.display(&ctx), "List<Int>");
}

#[test]
fn test_for_generator_variables_take_iterable_types() {
    let mut ws = TestWorkspace::new();
    let mut index = NodeIndex::NONE;
    let mut element = NodeIndex::NONE;
    let (module, _) = value_module(&mut ws, |b, members| {
        let string = b.declared_type("String", vec![]);
        let list_type = b.declared_type("List", vec![string]);
        members.push(b.property(&[], "names", Some(list_type), None));
        let i = b.param("i", None);
        let name = b.param("name", None);
        let iterable = b.ident("names");
        index = b.ident("i");
        let index_element = b.element(index);
        element = b.ident("name");
        let name_element = b.element(element);
        let body = b.object_body(vec![], vec![index_element, name_element]);
        let generator = b.for_generator(Some(i), name, iterable, body);
        let outer = b.object_body(vec![], vec![generator]);
        let dynamic = b.declared_type("Dynamic", vec![]);
        b.new_object(Some(dynamic), outer)
    });
    let ctx = ws.ctx();
    let base = ctx.base();
    let empty = TypeParameterBindings::new();
    assert_eq!(ctx.type_of_expr(at(module, index), &empty), base.int_type());
    assert_eq!(ctx.type_of_expr(at(module, element), &empty), base.string_type());
}

#[test]
fn test_listing_element_expected_type() {
    let mut ws = TestWorkspace::new();
    let mut element_value = NodeIndex::NONE;
    let mut new = NodeIndex::NONE;
    let module = ws.module("file:///test.pkl", |b| {
        let string = b.declared_type("String", vec![]);
        let listing = b.declared_type("Listing", vec![string]);
        element_value = b.string("a");
        let element = b.element(element_value);
        let body = b.object_body(vec![], vec![element]);
        new = b.new_object(None, body);
        let xs = b.property(&[], "xs", Some(listing), Some(new));
        b.module(Some("test"), None, vec![], vec![xs])
    });
    let ctx = ws.ctx();
    assert_eq!(ctx.expected_type_of(at(module, element_value)), ctx.base().string_type());
    let listing = ctx.type_of_expr(at(module, new), &TypeParameterBindings::new());
    assert_eq!(listing.display(&ctx), "Listing<String>");
}

#[test]
fn test_this_inside_class_is_the_class() {
    let mut ws = TestWorkspace::new();
    let mut this = NodeIndex::NONE;
    let module = ws.module("file:///test.pkl", |b| {
        this = b.this();
        let me = b.property(&[], "me", None, Some(this));
        let foo = b.class(&[], "Foo", vec![], None, vec![me]);
        b.module(Some("test"), None, vec![], vec![foo])
    });
    let ty = type_of(&ws, module, this);
    assert_eq!(ty.class_decl(), Some(ws.decl(module, "Foo")));
}

// =============================================================================
// Flow narrowing
// =============================================================================

#[test]
fn test_null_check_narrows_then_branch() {
    let mut ws = TestWorkspace::new();
    let mut narrowed = NodeIndex::NONE;
    let mut unnarrowed = NodeIndex::NONE;
    let (module, _) = value_module(&mut ws, |b, members| {
        members.push(nullable_property(b, "x", "String"));
        let x = b.ident("x");
        let null = b.null();
        let condition = b.binary(BinaryOp::NotEq, x, null);
        narrowed = b.ident("x");
        unnarrowed = b.ident("x");
        b.if_else(condition, narrowed, unnarrowed)
    });
    let ctx = ws.ctx();
    let base = ctx.base();
    let empty = TypeParameterBindings::new();
    assert_eq!(ctx.type_of_expr(at(module, narrowed), &empty), base.string_type());
    assert!(ctx.type_of_expr(at(module, unnarrowed), &empty).is_nullable(&ctx));
}

#[test]
fn test_type_test_narrows_both_branches() {
    let mut ws = TestWorkspace::new();
    let mut then_v = NodeIndex::NONE;
    let mut else_v = NodeIndex::NONE;
    let (module, _) = value_module(&mut ws, |b, members| {
        let int = b.declared_type("Int", vec![]);
        let string = b.declared_type("String", vec![]);
        let union = b.union_type(int, string);
        members.push(b.property(&[], "v", Some(union), None));
        let v = b.ident("v");
        let int = b.declared_type("Int", vec![]);
        let condition = b.is_type(v, int);
        then_v = b.ident("v");
        else_v = b.ident("v");
        b.if_else(condition, then_v, else_v)
    });
    let ctx = ws.ctx();
    let base = ctx.base();
    let empty = TypeParameterBindings::new();
    assert_eq!(ctx.type_of_expr(at(module, then_v), &empty), base.int_type());
    assert_eq!(ctx.type_of_expr(at(module, else_v), &empty), base.string_type());
}

#[test]
fn test_and_operand_sees_left_facts() {
    let mut ws = TestWorkspace::new();
    let mut x_in_right = NodeIndex::NONE;
    let mut length = NodeIndex::NONE;
    let (module, _) = value_module(&mut ws, |b, members| {
        members.push(nullable_property(b, "x", "String"));
        let x = b.ident("x");
        let null = b.null();
        let not_null = b.binary(BinaryOp::NotEq, x, null);
        x_in_right = b.ident("x");
        length = b.member(x_in_right, "length");
        let zero = b.int(0);
        let positive = b.binary(BinaryOp::Gt, length, zero);
        b.binary(BinaryOp::And, not_null, positive)
    });
    let ctx = ws.ctx();
    let base = ctx.base();
    let empty = TypeParameterBindings::new();
    assert_eq!(ctx.type_of_expr(at(module, x_in_right), &empty), base.string_type());
    assert_eq!(ctx.type_of_expr(at(module, length), &empty), base.int_type());
}

#[test]
fn test_shadowing_let_is_not_narrowed_by_outer_guard() {
    let mut ws = TestWorkspace::new();
    let mut outer = NodeIndex::NONE;
    let mut inner = NodeIndex::NONE;
    let (module, _) = value_module(&mut ws, |b, members| {
        members.push(nullable_property(b, "x", "String"));
        members.push(nullable_property(b, "y", "String"));
        let x = b.ident("x");
        let null = b.null();
        let condition = b.binary(BinaryOp::NotEq, x, null);
        // if (x != null) x + let (x = y) x else null
        outer = b.ident("x");
        let y = b.ident("y");
        inner = b.ident("x");
        let shadowed = b.let_in("x", y, inner);
        let both = b.binary(BinaryOp::Add, outer, shadowed);
        let otherwise = b.null();
        b.if_else(condition, both, otherwise)
    });
    let ctx = ws.ctx();
    let empty = TypeParameterBindings::new();
    assert_eq!(ctx.type_of_expr(at(module, outer), &empty), ctx.base().string_type());
    assert!(ctx.type_of_expr(at(module, inner), &empty).is_nullable(&ctx));
}

#[test]
fn test_null_coalescing_drops_null() {
    let mut ws = TestWorkspace::new();
    let (module, value) = value_module(&mut ws, |b, members| {
        members.push(nullable_property(b, "x", "Int"));
        let x = b.ident("x");
        let zero = b.int(0);
        b.binary(BinaryOp::NullCoalesce, x, zero)
    });
    assert_eq!(type_of(&ws, module, value), ws.ctx().base().int_type());
}

// =============================================================================
// Cycles
// =============================================================================

#[test]
fn test_self_referential_property_is_unknown() {
    let mut ws = TestWorkspace::new();
    let mut access = NodeIndex::NONE;
    let module = ws.module("file:///test.pkl", |b| {
        access = b.ident("x");
        let x = b.property(&[], "x", None, Some(access));
        b.module(Some("test"), None, vec![], vec![x])
    });
    assert!(type_of(&ws, module, access).is_unknown());
}

#[test]
fn test_self_referential_alias_terminates() {
    let mut ws = TestWorkspace::new();
    let module = ws.module("file:///test.pkl", |b| {
        let aliased = b.declared_type("Loop", vec![]);
        let alias = b.type_alias(&[], "Loop", vec![], aliased);
        let ty = b.declared_type("Loop", vec![]);
        let one = b.int(1);
        let prop = b.property(&[], "prop", Some(ty), Some(one));
        b.module(Some("test"), None, vec![], vec![alias, prop])
    });
    // Only termination matters; a looping alias accepts anything.
    let _ = ws.diagnostics(module);
}

#[test]
fn test_cyclic_class_hierarchy_terminates() {
    let mut ws = TestWorkspace::new();
    let mut access = NodeIndex::NONE;
    let module = ws.module("file:///test.pkl", |b| {
        let b_type = b.declared_type("B", vec![]);
        let a = b.class(&[], "A", vec![], Some(b_type), vec![]);
        let a_type = b.declared_type("A", vec![]);
        let class_b = b.class(&[], "B", vec![], Some(a_type), vec![]);
        let a_type = b.declared_type("A", vec![]);
        let value = b.property(&[], "value", Some(a_type), None);
        let receiver = b.ident("value");
        access = b.member(receiver, "missing");
        let prop = b.property(&[], "prop", None, Some(access));
        b.module(Some("test"), None, vec![], vec![a, class_b, value, prop])
    });
    assert!(type_of(&ws, module, access).is_unknown());
    let _ = ws.diagnostics(module);
}
