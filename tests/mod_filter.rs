use bson::{Bson, doc};
use multivarka::filter::{UpdateOptions, compare_fragment, conjoin, membership_fragment, set_fragment};
use multivarka::CompareOp;

#[test]
fn literal_operators() {
    assert_eq!(compare_fragment("age", CompareOp::Equal, 30.into()), doc! { "age": 30 });
    assert_eq!(compare_fragment("age", CompareOp::NotEqual, 30.into()), doc! { "age": { "$ne": 30 } });
    assert_eq!(compare_fragment("age", CompareOp::GreaterThan, 30.into()), doc! { "age": { "$gt": 30 } });
    assert_eq!(compare_fragment("age", CompareOp::LessThan, 30.into()), doc! { "age": { "$lt": 30 } });
}

#[test]
fn negation_flips_direction() {
    assert_eq!(CompareOp::Equal.negated(), CompareOp::NotEqual);
    assert_eq!(CompareOp::NotEqual.negated(), CompareOp::Equal);
    assert_eq!(CompareOp::LessThan.negated(), CompareOp::GreaterThan);
    assert_eq!(CompareOp::GreaterThan.negated(), CompareOp::LessThan);
    assert_eq!(CompareOp::LessThan.resolve(false), CompareOp::LessThan);
    assert_eq!(
        compare_fragment("age", CompareOp::LessThan.resolve(true), 30.into()),
        doc! { "age": { "$gt": 30 } }
    );
}

#[test]
fn membership_shapes() {
    let vals: Vec<Bson> = vec!["admin".into(), "owner".into()];
    assert_eq!(
        membership_fragment("role", &vals, false),
        doc! { "$or": [ { "role": "admin" }, { "role": "owner" } ] }
    );
    assert_eq!(
        membership_fragment("role", &vals, true),
        doc! { "role": [ { "$ne": "admin" }, { "$ne": "owner" } ] }
    );
}

#[test]
fn empty_membership_is_vacuous() {
    assert_eq!(membership_fragment("role", &[], false), doc! { "$or": [] });
    assert_eq!(membership_fragment("role", &[], true), doc! {});
}

#[test]
fn conjoin_flattens_into_one_and() {
    let first = conjoin(None, doc! { "a": 1 });
    assert_eq!(first, doc! { "a": 1 });
    let second = conjoin(Some(first), doc! { "b": 2 });
    assert_eq!(second, doc! { "$and": [ { "a": 1 }, { "b": 2 } ] });
    let third = conjoin(Some(second), doc! { "c": 3 });
    assert_eq!(third, doc! { "$and": [ { "a": 1 }, { "b": 2 }, { "c": 3 } ] });
}

#[test]
fn set_accumulates_assignments() {
    let spec = set_fragment(None, "active", false.into());
    assert_eq!(spec, doc! { "$set": { "active": false } });
    let spec = set_fragment(Some(spec), "tier", "free".into());
    assert_eq!(spec, doc! { "$set": { "active": false, "tier": "free" } });
    let spec = set_fragment(Some(spec), "active", true.into());
    assert_eq!(spec, doc! { "$set": { "active": true, "tier": "free" } });
    assert!(UpdateOptions::multi().multi);
    assert!(!UpdateOptions::default().multi);
}
