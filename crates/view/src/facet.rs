//! Per-column facets over a row subset: distinct values with counts, numeric bounds.

#![forbid(unsafe_code)]

use std::cmp::Ordering;

use serde::Serialize;
use tabula_core::{ColumnDescriptor, ColumnKind, Record, Value};

use crate::sort::compare_alphanumeric;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacetValue {
    pub value: Value,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum Facet {
    /// Text columns: distinct values.
    Unique(Vec<FacetValue>),
    /// Numeric columns: `(min, max)`, absent when no row has a value.
    Range(Option<(f64, f64)>),
}

fn facet_order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Text(x), Value::Text(y)) => compare_alphanumeric(x, y).then_with(|| x.cmp(y)),
        _ => a.raw_cmp(b),
    }
}

/// Distinct raw values of `column` in `rows`, with occurrence counts.
pub fn unique_values(rows: &[&Record], column: &ColumnDescriptor) -> Vec<FacetValue> {
    let mut values: Vec<&Value> = rows.iter().filter_map(|r| column.value(r)).collect();
    values.sort_by(|a, b| facet_order(a, b));
    let mut out: Vec<FacetValue> = Vec::new();
    for v in values {
        match out.last_mut() {
            Some(last) if last.value.raw_cmp(v) == Ordering::Equal => last.count += 1,
            _ => out.push(FacetValue { value: v.clone(), count: 1 }),
        }
    }
    out
}

/// Tight numeric bounds of `column` in `rows`. NaN cells are skipped.
pub fn min_max(rows: &[&Record], column: &ColumnDescriptor) -> Option<(f64, f64)> {
    if column.kind != ColumnKind::Numeric { return None; }
    rows.iter()
        .filter_map(|r| column.value(r).and_then(Value::as_number))
        .filter(|n| !n.is_nan())
        .fold(None, |acc, n| match acc {
            None => Some((n, n)),
            Some((lo, hi)) => Some((lo.min(n), hi.max(n))),
        })
}

/// Facet suited to the column kind.
pub fn facet(rows: &[&Record], column: &ColumnDescriptor) -> Facet {
    match column.kind {
        ColumnKind::Text => Facet::Unique(unique_values(rows, column)),
        ColumnKind::Numeric => Facet::Range(min_max(rows, column)),
    }
}
