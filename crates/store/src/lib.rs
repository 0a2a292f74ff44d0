//! Tabula store: immutable record sets and a JSON loader.
//!
//! A [`RecordSet`] is built once and then shared read-only; clones share the same rows.

#![forbid(unsafe_code)]

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tabula_core::columns::{validate_columns, validate_record};
use tabula_core::{ColumnDescriptor, GridError, Record, RecordId, Value};
use tracing::{debug, info};

/// Frozen, ordered set of records with unique ids.
#[derive(Debug, Clone)]
pub struct RecordSet {
    rows: Arc<[Record]>,
    by_id: Arc<FxHashMap<RecordId, usize>>,
}

impl Default for RecordSet {
    fn default() -> Self { RecordSetBuilder::new().freeze() }
}

impl RecordSet {
    /// Build from records in load order. Fails on a repeated id.
    pub fn new(records: Vec<Record>) -> tabula_core::Result<Self> {
        let mut b = RecordSetBuilder::with_capacity(records.len());
        for r in records { b.push(r)?; }
        Ok(b.freeze())
    }

    pub fn rows(&self) -> &[Record] { &self.rows }
    pub fn len(&self) -> usize { self.rows.len() }
    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.by_id.get(&id).map(|ix| &self.rows[*ix])
    }

    /// Check descriptors and that every cell matches its column kind.
    pub fn validate(&self, columns: &[ColumnDescriptor]) -> tabula_core::Result<()> {
        validate_columns(columns)?;
        for r in self.rows.iter() { validate_record(columns, r)?; }
        Ok(())
    }
}

/// Accumulates records, rejecting duplicate ids, then freezes them into a [`RecordSet`].
#[derive(Debug, Default)]
pub struct RecordSetBuilder {
    rows: Vec<Record>,
    by_id: FxHashMap<RecordId, usize>,
}

impl RecordSetBuilder {
    pub fn new() -> Self { Self::default() }

    pub fn with_capacity(cap: usize) -> Self {
        let mut by_id = FxHashMap::default();
        by_id.reserve(cap);
        Self { rows: Vec::with_capacity(cap), by_id }
    }

    pub fn push(&mut self, record: Record) -> tabula_core::Result<()> {
        if self.by_id.contains_key(&record.id) {
            return Err(GridError::DuplicateRecordId(record.id.0));
        }
        self.by_id.insert(record.id, self.rows.len());
        self.rows.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize { self.rows.len() }
    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn freeze(self) -> RecordSet {
        metrics::gauge!("records_loaded", self.rows.len() as f64);
        debug!(records = self.rows.len(), "record set frozen");
        RecordSet { rows: self.rows.into(), by_id: Arc::new(self.by_id) }
    }
}

fn cell_value(v: &serde_json::Value) -> Option<Value> {
    match v {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(Value::Text(s.clone())),
        serde_json::Value::Number(n) => n.as_f64().map(Value::Number),
        serde_json::Value::Bool(b) => Some(Value::Text(b.to_string())),
        other => Some(Value::Text(other.to_string())),
    }
}

fn record_id(v: &serde_json::Value) -> Option<u64> {
    match v {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Load a JSON array of flat objects. `id_field` supplies the record id (numbers or numeric
/// strings); rows without it take their position. The id is also kept as a numeric cell.
pub fn load_json(doc: &serde_json::Value, id_field: &str) -> Result<RecordSet> {
    let Some(items) = doc.as_array() else { bail!("expected a JSON array of objects") };
    let mut b = RecordSetBuilder::with_capacity(items.len());
    for (pos, item) in items.iter().enumerate() {
        let Some(obj) = item.as_object() else { bail!("row {pos} is not a JSON object") };
        let id = match obj.get(id_field) {
            Some(raw) => record_id(raw).with_context(|| format!("row {pos}: field {id_field:?} is not a non-negative integer"))?,
            None => pos as u64,
        };
        let mut cells: SmallVec<[(String, Value); 8]> = SmallVec::new();
        for (k, v) in obj.iter() {
            if k == id_field {
                cells.push((k.clone(), Value::Number(id as f64)));
            } else if let Some(val) = cell_value(v) {
                cells.push((k.clone(), val));
            }
        }
        b.push(Record { id: RecordId(id), cells }).with_context(|| format!("row {pos}"))?;
    }
    info!(records = b.len(), "records loaded");
    Ok(b.freeze())
}

pub fn load_json_str(s: &str, id_field: &str) -> Result<RecordSet> {
    let doc: serde_json::Value = serde_json::from_str(s).context("parsing records JSON")?;
    load_json(&doc, id_field)
}

pub fn load_path(path: &Path, id_field: &str) -> Result<RecordSet> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    load_json_str(&raw, id_field)
}

/// Derive column descriptors from the first record: numbers become numeric columns,
/// everything else fuzzy-filterable text.
pub fn infer_columns(set: &RecordSet) -> Vec<ColumnDescriptor> {
    let Some(first) = set.rows().first() else { return Vec::new() };
    first
        .cells
        .iter()
        .map(|(key, v)| match v {
            Value::Number(_) => ColumnDescriptor::numeric(key),
            Value::Text(_) => ColumnDescriptor::text(key).fuzzy(),
        })
        .collect()
}
