use proptest::prelude::*;
use tabula_core::{ColumnDescriptor, FilterSpec, FilterValue, Record};
use tabula_search::{filter, is_subsequence, rank};

fn columns() -> Vec<ColumnDescriptor> {
    vec![ColumnDescriptor::text("name").fuzzy(), ColumnDescriptor::numeric("age")]
}

fn records(rows: &[(String, i64)]) -> Vec<Record> {
    rows.iter()
        .enumerate()
        .map(|(i, (name, age))| Record::new(i as u64).with("name", name.as_str()).with("age", *age))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        rng_seed: proptest::test_runner::RngSeed::Fixed(0),
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn empty_query_always_passes(candidate in ".{0,24}") {
        prop_assert!(rank(&candidate, "").passed);
    }

    #[test]
    fn passed_iff_ordered_subsequence(candidate in "[a-cA-C ]{0,12}", query in "[a-cA-C]{1,4}") {
        let expected = is_subsequence(&candidate.to_lowercase(), &query.to_lowercase());
        prop_assert_eq!(rank(&candidate, &query).passed, expected);
    }

    #[test]
    fn filter_is_idempotent(
        rows in proptest::collection::vec(("[a-d]{0,6}", 0i64..100), 0..30),
        query in "[a-d]{0,3}",
        lo in 0i64..50,
        width in 0i64..60,
    ) {
        let recs = records(&rows);
        let cols = columns();
        let mut spec = FilterSpec::new();
        spec.insert("name".into(), FilterValue::text(query));
        spec.insert("age".into(), FilterValue::range(lo as f64, (lo + width) as f64));
        let once = filter(&recs, &cols, &spec, None);
        let twice = filter(once.rows.iter().copied(), &cols, &spec, None);
        let a: Vec<u64> = once.rows.iter().map(|r| r.id.0).collect();
        let b: Vec<u64> = twice.rows.iter().map(|r| r.id.0).collect();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn filter_preserves_input_order(rows in proptest::collection::vec(("[a-d]{0,6}", 0i64..100), 0..30), query in "[a-d]{1,2}") {
        let recs = records(&rows);
        let mut spec = FilterSpec::new();
        spec.insert("name".into(), FilterValue::text(query));
        let ids: Vec<u64> = filter(&recs, &columns(), &spec, None).rows.iter().map(|r| r.id.0).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        prop_assert_eq!(ids, sorted);
    }
}
