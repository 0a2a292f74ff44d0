//! Tabula core types: records, column descriptors, view state and errors.

#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub mod columns;
pub mod error;
pub mod state;

pub use columns::{ColumnDescriptor, ColumnKind};
pub use error::{GridError, Result};
pub use state::{EngineConfig, FilterSpec, FilterValue, SortDirection, SortKey, SortSpec, ViewState};

/// Stable record identity. Unique within a record set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// A single cell value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self { Value::Text(s.into()) }

    pub fn as_text(&self) -> Option<&str> {
        match self { Value::Text(s) => Some(s), Value::Number(_) => None }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self { Value::Number(n) => Some(*n), Value::Text(_) => None }
    }

    pub fn kind(&self) -> ColumnKind {
        match self { Value::Text(_) => ColumnKind::Text, Value::Number(_) => ColumnKind::Numeric }
    }

    /// Total order over raw values: numbers before text, numbers by `total_cmp`,
    /// text by code point. Used only where a deterministic tie-break is required.
    pub fn raw_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Number(_), Value::Text(_)) => Ordering::Less,
            (Value::Text(_), Value::Number(_)) => Ordering::Greater,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            // Integral numbers render without a trailing ".0"
            Value::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::Text(s.to_string()) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Value::Text(s) }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self { Value::Number(n) }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self { Value::Number(n as f64) }
}

/// Cell entry: `(column key, value)`.
pub type Cell = (String, Value);

/// One row of data. Cells keep their load order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub id: RecordId,
    pub cells: SmallVec<[Cell; 8]>,
}

impl Record {
    pub fn new(id: u64) -> Self { Self { id: RecordId(id), cells: SmallVec::new() } }

    /// Builder-style cell insertion; replaces an existing cell with the same key.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value.into());
        self
    }

    pub fn set(&mut self, key: &str, value: Value) {
        if let Some(slot) = self.cells.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
        } else {
            self.cells.push((key.to_string(), value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.cells.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

pub mod prelude {
    pub use super::{
        Cell, ColumnDescriptor, ColumnKind, EngineConfig, FilterSpec, FilterValue, GridError, Record, RecordId,
        SortDirection, SortKey, SortSpec, Value, ViewState,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_display_drops_integral_fraction() {
        assert_eq!(Value::Number(30.0).to_string(), "30");
        assert_eq!(Value::Number(-4.0).to_string(), "-4");
        assert_eq!(Value::Number(12.5).to_string(), "12.5");
        assert_eq!(Value::text("Ann").to_string(), "Ann");
    }

    #[test]
    fn record_set_replaces_existing_cell() {
        let r = Record::new(1).with("name", "Ann").with("age", 30i64).with("name", "Anna");
        assert_eq!(r.cells.len(), 2);
        assert_eq!(r.get("name"), Some(&Value::text("Anna")));
        assert_eq!(r.get("age").and_then(Value::as_number), Some(30.0));
        assert!(r.get("email").is_none());
    }

    #[test]
    fn value_json_is_untagged() {
        let v: Vec<Value> = serde_json::from_str(r#"[1.5, "x"]"#).unwrap();
        assert_eq!(v, vec![Value::Number(1.5), Value::text("x")]);
        assert_eq!(serde_json::to_string(&Value::text("y")).unwrap(), "\"y\"");
    }

    #[test]
    fn raw_cmp_is_total() {
        assert_eq!(Value::Number(1.0).raw_cmp(&Value::text("a")), Ordering::Less);
        assert_eq!(Value::text("B").raw_cmp(&Value::text("a")), Ordering::Less);
        assert_eq!(Value::Number(f64::NAN).raw_cmp(&Value::Number(f64::NAN)), Ordering::Equal);
    }
}
