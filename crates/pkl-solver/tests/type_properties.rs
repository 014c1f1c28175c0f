//! Property tests for the subtype relation and union normalization.

mod support;

use pkl_solver::Type;
use proptest::prelude::*;
use support::Fixture;

const LEAVES: &[&str] = &["Int", "Float", "Number", "String", "Boolean", "Null", "Any", "Duration"];

#[derive(Clone, Debug)]
enum Shape {
    Leaf(usize),
    Literal(&'static str),
    Listing(Box<Shape>),
    Union(Box<Shape>, Box<Shape>),
}

fn shape() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![
        (0..LEAVES.len()).prop_map(Shape::Leaf),
        prop_oneof![Just("a"), Just("b")].prop_map(Shape::Literal),
    ];
    leaf.prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|s| Shape::Listing(Box::new(s))),
            (inner.clone(), inner).prop_map(|(l, r)| Shape::Union(Box::new(l), Box::new(r))),
        ]
    })
}

fn build(fx: &Fixture, shape: &Shape) -> Type {
    match shape {
        Shape::Leaf(i) => fx.simple(LEAVES[*i]),
        Shape::Literal(s) => Type::string_literal(s),
        Shape::Listing(inner) => fx.ty("Listing", vec![build(fx, inner)]),
        Shape::Union(l, r) => fx.union(build(fx, l), build(fx, r)),
    }
}

proptest! {
    #[test]
    fn subtyping_is_reflexive(s in shape()) {
        let fx = Fixture::new();
        let t = build(&fx, &s);
        prop_assert!(t.is_subtype_of(&t, &fx));
    }

    #[test]
    fn subtyping_is_transitive(a in shape(), b in shape(), c in shape()) {
        let fx = Fixture::new();
        let (a, b, c) = (build(&fx, &a), build(&fx, &b), build(&fx, &c));
        if a.is_subtype_of(&b, &fx) && b.is_subtype_of(&c, &fx) {
            prop_assert!(a.is_subtype_of(&c, &fx));
        }
    }

    #[test]
    fn union_is_an_upper_bound(a in shape(), b in shape()) {
        let fx = Fixture::new();
        let (a, b) = (build(&fx, &a), build(&fx, &b));
        let union = fx.union(a.clone(), b.clone());
        prop_assert!(a.is_subtype_of(&union, &fx));
        prop_assert!(b.is_subtype_of(&union, &fx));
    }

    #[test]
    fn union_is_symmetric_up_to_equivalence(a in shape(), b in shape()) {
        let fx = Fixture::new();
        let (a, b) = (build(&fx, &a), build(&fx, &b));
        let ab = fx.union(a.clone(), b.clone());
        let ba = fx.union(b, a);
        prop_assert!(ab.is_equivalent_to(&ba, &fx));
    }

    #[test]
    fn union_is_idempotent(a in shape()) {
        let fx = Fixture::new();
        let a = build(&fx, &a);
        prop_assert_eq!(fx.union(a.clone(), a.clone()), a);
    }

    #[test]
    fn nullable_round_trip(a in shape()) {
        let fx = Fixture::new();
        let a = build(&fx, &a);
        let nullable = a.nullable(&fx);
        prop_assert!(nullable.is_nullable(&fx));
        prop_assert!(a.non_null(&fx).is_subtype_of(&a, &fx));
        prop_assert!(nullable.non_null(&fx).is_subtype_of(&a, &fx));
    }

    #[test]
    fn non_null_undoes_nullable(s in shape()) {
        prop_assume!(!matches!(s, Shape::Union(..)));
        prop_assume!(!matches!(s, Shape::Leaf(i) if LEAVES[i] == "Null"));
        let fx = Fixture::new();
        let t = build(&fx, &s);
        let round_trip = t.nullable(&fx).non_null(&fx);
        prop_assert!(round_trip.is_equivalent_to(&t, &fx), "{:?} vs {:?}", round_trip, t);
    }
}
