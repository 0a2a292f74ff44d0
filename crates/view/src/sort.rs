//! Multi-column stable sorting.

#![forbid(unsafe_code)]

use std::cmp::Ordering;

use tabula_core::columns::column_index;
use tabula_core::{ColumnDescriptor, ColumnKind, Record, SortDirection, SortSpec, Value};
use tabula_search::{compare_ranks, RankContext};
use tracing::{debug, warn};

enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

fn chunks(s: &str) -> impl Iterator<Item = Chunk<'_>> {
    let mut rest = s;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = rest.find(|c: char| c.is_ascii_digit() != digits).unwrap_or(rest.len());
        let (head, tail) = rest.split_at(end);
        rest = tail;
        Some(if digits { Chunk::Digits(head) } else { Chunk::Text(head) })
    })
}

fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Case-insensitive natural order: digit runs compare numerically and sort before text,
/// so `"item 2"` precedes `"item 10"`.
pub fn compare_alphanumeric(a: &str, b: &str) -> Ordering {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let mut ca = chunks(&a);
    let mut cb = chunks(&b);
    loop {
        let ord = match (ca.next(), cb.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(Chunk::Digits(x)), Some(Chunk::Digits(y))) => cmp_digits(x, y),
            (Some(Chunk::Text(x)), Some(Chunk::Text(y))) => x.cmp(y),
            (Some(Chunk::Digits(_)), Some(Chunk::Text(_))) => Ordering::Less,
            (Some(Chunk::Text(_)), Some(Chunk::Digits(_))) => Ordering::Greater,
        };
        if ord != Ordering::Equal { return ord; }
    }
}

/// Generic per-kind comparison of two present values.
pub fn compare_values(kind: ColumnKind, a: &Value, b: &Value) -> Ordering {
    match (kind, a, b) {
        (ColumnKind::Numeric, Value::Number(x), Value::Number(y)) => x.total_cmp(y),
        _ => compare_alphanumeric(&a.to_string(), &b.to_string()),
    }
}

struct Key<'c> {
    ix: usize,
    col: &'c ColumnDescriptor,
    desc: bool,
}

fn resolve<'c>(columns: &'c [ColumnDescriptor], spec: &SortSpec) -> Vec<Key<'c>> {
    let mut keys = Vec::with_capacity(spec.len());
    for k in spec.iter() {
        let Some(ix) = column_index(columns, &k.column) else {
            warn!(column = %k.column, "sort names unknown column; ignored");
            continue;
        };
        let col = &columns[ix];
        if !col.sortable {
            warn!(column = %k.column, "column is not sortable; ignored");
            continue;
        }
        if keys.iter().any(|p: &Key<'_>| p.ix == ix) { continue; }
        keys.push(Key { ix, col, desc: k.direction == SortDirection::Desc });
    }
    keys
}

fn compare_key(key: &Key<'_>, ranks: &RankContext, a: &Record, b: &Record) -> Ordering {
    let (va, vb) = match (key.col.value(a), key.col.value(b)) {
        (Some(x), Some(y)) => (x, y),
        // Missing cells go last in either direction
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Greater,
        (Some(_), None) => return Ordering::Less,
    };
    let mut ord = Ordering::Equal;
    if ranks.ranks_column(key.ix) {
        ord = match (ranks.get(a.id, key.ix), ranks.get(b.id, key.ix)) {
            (Some(ra), Some(rb)) => compare_ranks(ra, rb),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
    }
    let ord = ord.then_with(|| compare_values(key.col.kind, va, vb));
    if key.desc { ord.reverse() } else { ord }
}

/// Order rows by `spec`. Rows equal on every key keep their input order.
pub fn sort<'r>(rows: &[&'r Record], columns: &[ColumnDescriptor], spec: &SortSpec, ranks: &RankContext) -> Vec<&'r Record> {
    let mut out = rows.to_vec();
    let keys = resolve(columns, spec);
    if keys.is_empty() { return out; }
    let started = std::time::Instant::now();
    out.sort_by(|a, b| {
        keys.iter()
            .map(|k| compare_key(k, ranks, a, b))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
    metrics::histogram!("sort_eval_ms", started.elapsed().as_secs_f64() * 1_000.0);
    debug!(rows = out.len(), keys = keys.len(), "rows sorted");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::{FilterSpec, FilterValue, SortKey};
    use tabula_search::filter;

    fn cols() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::text("name").fuzzy(),
            ColumnDescriptor::numeric("age"),
            ColumnDescriptor::text("city"),
            ColumnDescriptor::text("avatar").unsortable(),
        ]
    }

    fn ids(rows: &[&Record]) -> Vec<u64> { rows.iter().map(|r| r.id.0).collect() }

    #[test]
    fn natural_order() {
        assert_eq!(compare_alphanumeric("item 2", "item 10"), Ordering::Less);
        assert_eq!(compare_alphanumeric("Item10", "item9"), Ordering::Greater);
        assert_eq!(compare_alphanumeric("abc", "ABC"), Ordering::Equal);
        assert_eq!(compare_alphanumeric("007", "7"), Ordering::Equal);
        assert_eq!(compare_alphanumeric("1a", "a1"), Ordering::Less);
        assert_eq!(compare_alphanumeric("ab", "abc"), Ordering::Less);
        assert_eq!(compare_alphanumeric("x99999999999999999999999", "x100000000000000000000000"), Ordering::Less);
    }

    #[test]
    fn multi_key_then_stable() {
        let recs = vec![
            Record::new(1).with("name", "b").with("age", 30i64),
            Record::new(2).with("name", "a").with("age", 30i64),
            Record::new(3).with("name", "c").with("age", 20i64),
            Record::new(4).with("name", "a").with("age", 30i64),
        ];
        let rows: Vec<&Record> = recs.iter().collect();
        let spec = vec![SortKey::desc("age"), SortKey::asc("name")];
        assert_eq!(ids(&sort(&rows, &cols(), &spec, &RankContext::default())), vec![2, 4, 1, 3]);
    }

    #[test]
    fn direction_does_not_flip_ties() {
        let recs = vec![
            Record::new(1).with("city", "Oslo"),
            Record::new(2).with("city", "oslo"),
            Record::new(3).with("city", "Bergen"),
        ];
        let rows: Vec<&Record> = recs.iter().collect();
        let asc = sort(&rows, &cols(), &vec![SortKey::asc("city")], &RankContext::default());
        let desc = sort(&rows, &cols(), &vec![SortKey::desc("city")], &RankContext::default());
        assert_eq!(ids(&asc), vec![3, 1, 2]);
        assert_eq!(ids(&desc), vec![1, 2, 3]);
    }

    #[test]
    fn unknown_and_unsortable_columns_are_skipped() {
        let recs = vec![Record::new(1).with("age", 2i64).with("avatar", "z"), Record::new(2).with("age", 1i64).with("avatar", "a")];
        let rows: Vec<&Record> = recs.iter().collect();
        let spec = vec![SortKey::asc("ghost"), SortKey::asc("avatar"), SortKey::asc("age")];
        assert_eq!(ids(&sort(&rows, &cols(), &spec, &RankContext::default())), vec![2, 1]);
        let only_ghost = vec![SortKey::asc("ghost")];
        assert_eq!(ids(&sort(&rows, &cols(), &only_ghost, &RankContext::default())), vec![1, 2]);
    }

    #[test]
    fn missing_values_sort_last_both_ways() {
        let recs = vec![Record::new(1), Record::new(2).with("age", 5i64), Record::new(3).with("age", 1i64)];
        let rows: Vec<&Record> = recs.iter().collect();
        assert_eq!(ids(&sort(&rows, &cols(), &vec![SortKey::asc("age")], &RankContext::default())), vec![3, 2, 1]);
        assert_eq!(ids(&sort(&rows, &cols(), &vec![SortKey::desc("age")], &RankContext::default())), vec![2, 3, 1]);
    }

    #[test]
    fn fuzzy_filtered_column_orders_by_rank_first() {
        let recs = vec![
            Record::new(1).with("name", "Bethel"),
            Record::new(2).with("name", "Anna Bell"),
            Record::new(3).with("name", "Bell"),
            Record::new(4).with("name", "Abel"),
        ];
        let cols = cols();
        let mut f = FilterSpec::new();
        f.insert("name".into(), FilterValue::text("bel"));
        let filtered = filter(&recs, &cols, &f, None);
        let sorted = sort(&filtered.rows, &cols, &vec![SortKey::asc("name")], &filtered.ranks);
        // StartsWith, WordStartsWith, Contains, Fuzzy
        assert_eq!(ids(&sorted), vec![3, 2, 4, 1]);
        let rev = sort(&filtered.rows, &cols, &vec![SortKey::desc("name")], &filtered.ranks);
        assert_eq!(ids(&rev), vec![1, 4, 2, 3]);
    }

    #[test]
    fn equal_ranks_fall_back_to_alphanumeric() {
        let recs = vec![Record::new(1).with("name", "Annie"), Record::new(2).with("name", "Ann 10"), Record::new(3).with("name", "Ann 9")];
        let cols = cols();
        let mut f = FilterSpec::new();
        f.insert("name".into(), FilterValue::text("ann"));
        let filtered = filter(&recs, &cols, &f, None);
        let sorted = sort(&filtered.rows, &cols, &vec![SortKey::asc("name")], &filtered.ranks);
        assert_eq!(ids(&sorted), vec![3, 2, 1]);
    }
}
