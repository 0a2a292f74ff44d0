use tabula_api::{Engine, RecordSet};
use tabula_core::{ColumnDescriptor, EngineConfig, FilterValue, GridError, Record, SortKey, Value, ViewState};
use tabula_view::{Facet, FacetValue, PageItem};

fn users() -> Engine {
    let recs = vec![
        Record::new(1).with("name", "Ann").with("age", 30i64).with("city", "Oslo"),
        Record::new(2).with("name", "Anna").with("age", 12i64).with("city", "Bergen"),
        Record::new(3).with("name", "Bob").with("age", 45i64).with("city", "Oslo"),
    ];
    let cols = vec![
        ColumnDescriptor::text("name").fuzzy(),
        ColumnDescriptor::numeric("age"),
        ColumnDescriptor::text("city"),
    ];
    Engine::new(RecordSet::new(recs).unwrap(), cols).unwrap()
}

fn ids(e: &Engine) -> Vec<u64> { e.page().unwrap().rows.iter().map(|r| r.id.0).collect() }

#[test]
fn name_filter_keeps_ann_and_anna() {
    let mut e = users();
    e.set_filter("name", FilterValue::text("an")).unwrap();
    assert_eq!(e.total_filtered_count(), 2);
    assert_eq!(ids(&e), vec![1, 2]);
}

#[test]
fn min_max_of_ages() {
    let e = users();
    assert_eq!(e.min_max("age").unwrap(), Some((12.0, 45.0)));
    assert_eq!(e.min_max("name").unwrap(), None);
    assert_eq!(e.min_max("ghost"), Err(GridError::UnknownColumn("ghost".into())));
}

#[test]
fn facets_ignore_their_own_filter() {
    let mut e = users();
    e.set_filter("age", FilterValue::range(20.0, 50.0)).unwrap();
    e.set_filter("city", FilterValue::text("oslo")).unwrap();
    assert_eq!(ids(&e), vec![1, 3]);
    // The age facet still sees Anna (12) since only the city filter applies to it.
    assert_eq!(e.min_max("age").unwrap(), Some((30.0, 45.0)));
    e.set_filter("city", FilterValue::text("")).unwrap();
    assert_eq!(e.facet("age").unwrap(), Facet::Range(Some((12.0, 45.0))));
    let cities = e.unique_values("city").unwrap();
    assert_eq!(
        cities,
        vec![FacetValue { value: Value::text("Oslo"), count: 2 }]
    );
    // Facets are recomputed on every call, never stale after a filter change.
    e.clear_filters();
    assert_eq!(e.unique_values("city").unwrap().len(), 2);
}

#[test]
fn global_filter_matches_any_fuzzy_column() {
    let mut e = users();
    e.set_global_filter("bo");
    assert_eq!(ids(&e), vec![3]);
    e.set_global_filter("");
    assert_eq!(e.total_filtered_count(), 3);
}

#[test]
fn sort_by_rank_then_value() {
    let mut e = users();
    e.set_filter("name", FilterValue::text("ann")).unwrap();
    e.set_sort(vec![SortKey::asc("name")]).unwrap();
    // "Ann" equals the query, "Anna" only starts with it
    assert_eq!(ids(&e), vec![1, 2]);
    e.set_sort(vec![SortKey::desc("name")]).unwrap();
    assert_eq!(ids(&e), vec![2, 1]);
    e.clear_filters();
    e.set_sort(vec![SortKey::desc("age")]).unwrap();
    assert_eq!(ids(&e), vec![3, 1, 2]);
}

#[test]
fn twenty_three_rows_in_pages_of_five() {
    let recs = (1..=23).map(|i| Record::new(i).with("n", i as i64)).collect();
    let mut e = Engine::with_config(
        RecordSet::new(recs).unwrap(),
        vec![ColumnDescriptor::numeric("n")],
        EngineConfig { default_page_size: 5, window_radius: 2 },
    )
    .unwrap();
    e.set_page(4);
    assert_eq!(ids(&e), vec![21, 22, 23]);
    e.set_page(7);
    assert_eq!(e.page().unwrap().index, 4);
    assert_eq!(
        e.window().unwrap(),
        vec![PageItem::Page(1), PageItem::Ellipsis, PageItem::Page(3), PageItem::Page(4), PageItem::Page(5)]
    );
    e.set_filter("n", FilterValue::range(100.0, 200.0)).unwrap();
    let empty = e.page().unwrap();
    assert!(empty.rows.is_empty());
    assert_eq!(empty.page_count, 0);
    assert!(e.window().unwrap().is_empty());
}

#[test]
fn view_state_round_trip_restores_same_page() {
    let mut e = users();
    e.set_filter("name", FilterValue::text("an")).unwrap();
    e.set_sort(vec![SortKey::desc("age")]).unwrap();
    e.set_column_visibility("city", false).unwrap();
    let saved = serde_json::to_string(e.view_state()).unwrap();
    let page = e.page().unwrap();

    let mut other = users();
    let state: ViewState = serde_json::from_str(&saved).unwrap();
    other.restore(state).unwrap();
    assert_eq!(other.page().unwrap(), page);
    assert_eq!(page.columns, vec!["name".to_string(), "age".to_string()]);
}

#[test]
fn restore_rejects_invalid_state() {
    let mut e = users();
    let before = e.view_state().clone();
    let mut bad = ViewState::new(5);
    bad.filters.insert("age".into(), FilterValue::text("x"));
    assert!(e.restore(bad).is_err());
    assert!(e.restore(ViewState::new(0)).is_err());
    let mut ghost = ViewState::new(5);
    ghost.column_visibility.insert("ghost".into(), true);
    assert!(e.restore(ghost).is_err());
    assert_eq!(e.view_state(), &before);
}

#[test]
fn mismatched_records_rejected_at_construction() {
    let recs = vec![Record::new(1).with("age", "old")];
    let err = Engine::new(RecordSet::new(recs).unwrap(), vec![ColumnDescriptor::numeric("age")]).unwrap_err();
    assert!(err.is_invalid_configuration());
}
