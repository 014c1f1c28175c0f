use super::*;
use pkl_syntax::{ModuleId, TreeBuilder};

/// Build a one-expression module and return the tree and the expression.
fn expr(build: impl FnOnce(&mut TreeBuilder) -> NodeIndex) -> (SyntaxTree, NodeIndex) {
    let mut b = TreeBuilder::new("file:///constraint.pkl", ModuleId(1));
    let e = build(&mut b);
    let prop = b.property(&[], "x", None, Some(e));
    let root = b.module(None, None, vec![], vec![prop]);
    (b.finish(root), e)
}

fn string(s: &str) -> ConstantValue {
    ConstantValue::String(s.into())
}

#[test]
fn test_constant_arithmetic() {
    let (tree, e) = expr(|b| {
        let two = b.int(2);
        let three = b.int(3);
        let four = b.int(4);
        let product = b.binary(BinaryOp::Mul, three, four);
        b.binary(BinaryOp::Add, two, product)
    });
    assert_eq!(constant_value(&tree, e), Some(ConstantValue::Int(14)));

    let (tree, e) = expr(|b| {
        let one = b.int(1);
        let two = b.int(2);
        b.binary(BinaryOp::Div, one, two)
    });
    assert_eq!(constant_value(&tree, e), Some(ConstantValue::Float(0.5)));
}

#[test]
fn test_constant_overflow_and_division_by_zero_are_unknown() {
    let (tree, e) = expr(|b| {
        let max = b.int(i64::MAX);
        let one = b.int(1);
        b.binary(BinaryOp::Add, max, one)
    });
    assert_eq!(constant_value(&tree, e), None);

    let (tree, e) = expr(|b| {
        let one = b.int(1);
        let zero = b.int(0);
        b.binary(BinaryOp::IntDiv, one, zero)
    });
    assert_eq!(constant_value(&tree, e), None);
}

#[test]
fn test_constant_strings_and_control_flow() {
    let (tree, e) = expr(|b| {
        let hello = b.string("hello");
        let world = b.string(" world");
        b.binary(BinaryOp::Add, hello, world)
    });
    assert_eq!(constant_value(&tree, e), Some(string("hello world")));

    let (tree, e) = expr(|b| {
        let cond = b.boolean(false);
        let then = b.string("yes");
        let otherwise = b.string("no");
        b.if_else(cond, then, otherwise)
    });
    assert_eq!(constant_value(&tree, e), Some(string("no")));

    let (tree, e) = expr(|b| {
        let null = b.null();
        let fallback = b.int(7);
        b.binary(BinaryOp::NullCoalesce, null, fallback)
    });
    assert_eq!(constant_value(&tree, e), Some(ConstantValue::Int(7)));
}

#[test]
fn test_non_constants() {
    let (tree, e) = expr(|b| b.ident("other"));
    assert_eq!(constant_value(&tree, e), None);

    let (tree, e) = expr(|b| {
        let receiver = b.ident("other");
        b.member(receiver, "length")
    });
    assert_eq!(constant_value(&tree, e), None);
}

#[test]
fn test_constant_member_access() {
    let (tree, e) = expr(|b| {
        let s = b.string("héllo");
        b.member(s, "length")
    });
    assert_eq!(constant_value(&tree, e), Some(ConstantValue::Int(5)));

    let (tree, e) = expr(|b| {
        let s = b.string("abc");
        b.method_call(s, "toUpperCase", vec![])
    });
    assert_eq!(constant_value(&tree, e), Some(string("ABC")));
}

#[test]
fn test_constraint_over_implicit_receiver() {
    let (tree, e) = expr(|b| {
        let length = b.ident("length");
        let three = b.int(3);
        b.binary(BinaryOp::Gt, length, three)
    });
    assert_eq!(evaluate_constraint(&tree, e, &string("hello")), ConstraintValue::True);
    assert_eq!(evaluate_constraint(&tree, e, &string("hi")), ConstraintValue::False);
    assert_eq!(
        evaluate_constraint(&tree, e, &ConstantValue::Int(10)),
        ConstraintValue::Error
    );
}

#[test]
fn test_is_between_constraint() {
    let (tree, e) = expr(|b| {
        let min = b.int(0);
        let max = b.int(255);
        b.call("isBetween", vec![min, max])
    });
    assert!(evaluate_constraint(&tree, e, &ConstantValue::Int(0)).is_satisfied());
    assert!(evaluate_constraint(&tree, e, &ConstantValue::Int(255)).is_satisfied());
    assert_eq!(
        evaluate_constraint(&tree, e, &ConstantValue::Int(256)),
        ConstraintValue::False
    );
    assert_eq!(
        evaluate_constraint(&tree, e, &ConstantValue::Int(-1)),
        ConstraintValue::False
    );
}

#[test]
fn test_lambda_constraint() {
    let (tree, e) = expr(|b| {
        let s = b.param("s", None);
        let receiver = b.ident("s");
        let prefix = b.string("http");
        let call = b.method_call(receiver, "startsWith", vec![prefix]);
        b.lambda(vec![s], call)
    });
    assert_eq!(
        evaluate_constraint(&tree, e, &string("https://pkl-lang.org")),
        ConstraintValue::True
    );
    assert_eq!(evaluate_constraint(&tree, e, &string("ftp://x")), ConstraintValue::False);
}

#[test]
fn test_regex_matches_whole_string() {
    let (tree, e) = expr(|b| {
        let pattern = b.string("[a-z]+");
        let regex = b.call("Regex", vec![pattern]);
        b.call("matches", vec![regex])
    });
    assert!(evaluate_constraint(&tree, e, &string("abc")).is_satisfied());
    assert_eq!(evaluate_constraint(&tree, e, &string("abc1")), ConstraintValue::False);
}

#[test]
fn test_three_valued_logic() {
    // unknown && false is false, unknown || true is true
    let (tree, e) = expr(|b| {
        let unknown = b.ident("somethingElse");
        let f = b.boolean(false);
        b.binary(BinaryOp::And, unknown, f)
    });
    assert_eq!(evaluate_constraint(&tree, e, &ConstantValue::Int(1)), ConstraintValue::False);

    let (tree, e) = expr(|b| {
        let unknown = b.ident("somethingElse");
        let t = b.boolean(true);
        b.binary(BinaryOp::Or, unknown, t)
    });
    assert_eq!(evaluate_constraint(&tree, e, &ConstantValue::Int(1)), ConstraintValue::True);

    let (tree, e) = expr(|b| {
        let unknown = b.ident("somethingElse");
        b.unary(UnaryOp::Not, unknown)
    });
    assert_eq!(evaluate_constraint(&tree, e, &ConstantValue::Int(1)), ConstraintValue::Error);
}

#[test]
fn test_is_positive_includes_zero() {
    let (tree, e) = expr(|b| b.ident("isPositive"));
    assert!(evaluate_constraint(&tree, e, &ConstantValue::Int(0)).is_satisfied());
    assert!(evaluate_constraint(&tree, e, &ConstantValue::Float(0.0)).is_satisfied());
    assert_eq!(
        evaluate_constraint(&tree, e, &ConstantValue::Int(-3)),
        ConstraintValue::False
    );
}

#[test]
fn test_render_values() {
    assert_eq!(string("a\"b").render(), "\"a\\\"b\"");
    assert_eq!(ConstantValue::Float(2.0).render(), "2.0");
    assert_eq!(ConstantValue::Float(f64::NAN).render(), "NaN");
    assert_eq!(ConstantValue::Null.render(), "null");
}
