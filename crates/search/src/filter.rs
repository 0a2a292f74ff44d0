//! Row filtering over per-column predicates and an optional global query.

#![forbid(unsafe_code)]

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tabula_core::columns::{column_index, find_column};
use tabula_core::{ColumnDescriptor, ColumnKind, FilterSpec, FilterValue, Record, RecordId, Result, Value};
use tracing::{debug, warn};

use crate::rank::{RankResult, Ranker};

/// Rank results recorded while filtering, keyed by `(record id, column index)`.
/// Sorting reads them back instead of re-ranking.
#[derive(Debug, Clone, Default)]
pub struct RankContext {
    ranks: FxHashMap<(RecordId, usize), RankResult>,
    columns: SmallVec<[usize; 4]>,
}

impl RankContext {
    pub fn get(&self, id: RecordId, column: usize) -> Option<&RankResult> { self.ranks.get(&(id, column)) }

    /// Whether any rank was recorded for `column`.
    pub fn ranks_column(&self, column: usize) -> bool { self.columns.contains(&column) }

    pub fn len(&self) -> usize { self.ranks.len() }
    pub fn is_empty(&self) -> bool { self.ranks.is_empty() }

    fn mark(&mut self, column: usize) {
        if !self.columns.contains(&column) { self.columns.push(column); }
    }

    fn insert(&mut self, id: RecordId, column: usize, rank: RankResult) {
        self.ranks.insert((id, column), rank);
    }
}

#[derive(Debug, Clone, Default)]
pub struct Filtered<'r> {
    pub rows: Vec<&'r Record>,
    pub ranks: RankContext,
}

// A validated filter entry bound to its column.
struct Active<'a> {
    ix: usize,
    col: &'a ColumnDescriptor,
    value: &'a FilterValue,
}

/// Check every filter entry against the descriptor list.
pub fn validate_filters(columns: &[ColumnDescriptor], filters: &FilterSpec) -> Result<()> {
    for (id, value) in filters.iter() {
        let (_, col) = find_column(columns, id)?;
        value.validate(col)?;
    }
    Ok(())
}

fn active<'a>(columns: &'a [ColumnDescriptor], filters: &'a FilterSpec, except: Option<&str>) -> Vec<Active<'a>> {
    let mut out = Vec::with_capacity(filters.len());
    for (id, value) in filters.iter() {
        if except == Some(id.as_str()) || value.is_empty() { continue; }
        let Some(ix) = column_index(columns, id) else {
            warn!(column = %id, "filter names unknown column; ignored");
            continue;
        };
        let col = &columns[ix];
        if value.validate(col).is_err() {
            warn!(column = %id, "filter does not fit column; ignored");
            continue;
        }
        out.push(Active { ix, col, value });
    }
    out
}

fn text_of(v: &Value) -> String { v.to_string() }

fn matches_plain(value: &Value, query: &str) -> bool {
    text_of(value).to_lowercase().contains(&query.to_lowercase())
}

/// Evaluate one column predicate. Fuzzy text predicates return their rank too.
fn eval(ranker: &Ranker, f: &Active<'_>, record: &Record) -> (bool, Option<RankResult>) {
    let Some(value) = f.col.value(record) else { return (false, None) };
    match (f.value, f.col.kind) {
        (FilterValue::Text(q), ColumnKind::Text) if f.col.fuzzy => {
            let r = ranker.rank(&text_of(value), q);
            (r.passed, Some(r))
        }
        (FilterValue::Text(q), _) => (matches_plain(value, q), None),
        (FilterValue::Range { lo, hi }, _) => {
            let ok = value.as_number().map(|n| *lo <= n && n <= *hi).unwrap_or(false);
            (ok, None)
        }
    }
}

fn run<'r>(
    rows: impl IntoIterator<Item = &'r Record>,
    columns: &[ColumnDescriptor],
    filters: &FilterSpec,
    global: Option<&str>,
    except: Option<&str>,
    record_ranks: bool,
) -> Filtered<'r> {
    let started = std::time::Instant::now();
    let ranker = Ranker::new();
    let active = active(columns, filters, except);
    let global = global.filter(|q| !q.is_empty());
    let global_cols: SmallVec<[usize; 8]> = columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.fuzzy && c.kind == ColumnKind::Text)
        .map(|(i, _)| i)
        .collect();

    let mut out = Filtered::default();
    if record_ranks {
        for f in active.iter().filter(|f| f.col.fuzzy && f.col.kind == ColumnKind::Text) { out.ranks.mark(f.ix); }
        if global.is_some() {
            for ix in global_cols.iter().filter(|ix| !active.iter().any(|f| f.ix == **ix)) { out.ranks.mark(*ix); }
        }
    }

    let mut seen = 0usize;
    'row: for record in rows {
        seen += 1;
        let mut pending: SmallVec<[(usize, RankResult); 4]> = SmallVec::new();
        for f in active.iter() {
            let (ok, rank) = eval(&ranker, f, record);
            if !ok { continue 'row; }
            if let Some(r) = rank { pending.push((f.ix, r)); }
        }
        if let Some(q) = global {
            let mut any = false;
            for ix in global_cols.iter() {
                let Some(value) = columns[*ix].value(record) else { continue };
                let r = ranker.rank(&text_of(value), q);
                any |= r.passed;
                // A column's own filter rank takes precedence
                if !pending.iter().any(|(c, _)| c == ix) { pending.push((*ix, r)); }
            }
            if !any { continue 'row; }
        }
        if record_ranks {
            for (ix, r) in pending { out.ranks.insert(record.id, ix, r); }
        }
        out.rows.push(record);
    }

    let elapsed = started.elapsed();
    metrics::histogram!("filter_eval_ms", elapsed.as_secs_f64() * 1_000.0);
    debug!(rows_in = seen, rows_out = out.rows.len(), filters = active.len(), global = global.is_some(), "filter evaluated");
    out
}

/// Apply every filter entry (AND) and the global query. Pure; entries naming unknown
/// columns or carrying a value of the wrong kind are skipped.
pub fn filter<'r>(
    rows: impl IntoIterator<Item = &'r Record>,
    columns: &[ColumnDescriptor],
    filters: &FilterSpec,
    global: Option<&str>,
) -> Filtered<'r> {
    run(rows, columns, filters, global, None, true)
}

/// Rows passing every constraint except the filter on `except_column`.
pub fn pre_filter<'r>(
    rows: impl IntoIterator<Item = &'r Record>,
    columns: &[ColumnDescriptor],
    filters: &FilterSpec,
    global: Option<&str>,
    except_column: &str,
) -> Vec<&'r Record> {
    run(rows, columns, filters, global, Some(except_column), false).rows
}
