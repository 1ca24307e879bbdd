use bson::{Bson, Document, doc};
use multivarka::CompareOp;
use multivarka::filter::{compare_fragment, conjoin, membership_fragment};
use multivarka::store::{eval_filter, parse_filter};
use proptest::prelude::*;

fn matches(filter: &Document, docs: &[Document]) -> Vec<i32> {
    let parsed = parse_filter(filter).unwrap();
    docs.iter().filter(|d| eval_filter(d, &parsed)).map(|d| d.get_i32("v").unwrap()).collect()
}

fn docs_of(values: &[i32]) -> Vec<Document> {
    values.iter().map(|v| doc! { "v": *v }).collect()
}

proptest! {
    #[test]
    fn prop_negated_range_is_strict_opposite(values in proptest::collection::vec(-50i32..50, 0..40), pivot in -50i32..50) {
        let docs = docs_of(&values);
        let below = matches(&compare_fragment("v", CompareOp::LessThan.resolve(true), pivot.into()), &docs);
        prop_assert!(below.iter().all(|v| *v > pivot));
        prop_assert_eq!(below.len(), values.iter().filter(|v| **v > pivot).count());

        let above = matches(&compare_fragment("v", CompareOp::GreaterThan.resolve(true), pivot.into()), &docs);
        prop_assert_eq!(above.len(), values.iter().filter(|v| **v < pivot).count());
    }

    #[test]
    fn prop_equal_and_negated_equal_partition(values in proptest::collection::vec(-5i32..5, 0..40), pivot in -5i32..5) {
        let docs = docs_of(&values);
        let eq = matches(&compare_fragment("v", CompareOp::Equal, pivot.into()), &docs);
        let ne = matches(&compare_fragment("v", CompareOp::Equal.resolve(true), pivot.into()), &docs);
        prop_assert_eq!(eq.len() + ne.len(), values.len());
        prop_assert!(ne.iter().all(|v| *v != pivot));
    }

    #[test]
    fn prop_include_and_negated_include_partition(
        values in proptest::collection::vec(0i32..10, 0..40),
        candidates in proptest::collection::vec(0i32..10, 0..6),
    ) {
        let docs = docs_of(&values);
        let set: Vec<Bson> = candidates.iter().map(|c| Bson::Int32(*c)).collect();

        let inside = membership_fragment("v", &set, false);
        let Some(Bson::Array(clauses)) = inside.get("$or") else { panic!("expected $or") };
        prop_assert_eq!(clauses.len(), candidates.len());

        let hit = matches(&inside, &docs);
        let miss = matches(&membership_fragment("v", &set, true), &docs);
        prop_assert!(hit.iter().all(|v| candidates.contains(v)));
        prop_assert!(miss.iter().all(|v| !candidates.contains(v)));
        prop_assert_eq!(hit.len() + miss.len(), values.len());
    }

    #[test]
    fn prop_conjoined_clauses_intersect(values in proptest::collection::vec(-20i32..20, 0..40), lo in -20i32..0, hi in 0i32..20) {
        let docs = docs_of(&values);
        let filter = conjoin(
            Some(compare_fragment("v", CompareOp::GreaterThan, lo.into())),
            compare_fragment("v", CompareOp::LessThan, hi.into()),
        );
        let found = matches(&filter, &docs);
        prop_assert_eq!(found.len(), values.iter().filter(|v| **v > lo && **v < hi).count());
    }
}
