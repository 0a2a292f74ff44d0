//! Column descriptors.
//!
//! A descriptor names a column, says how to read its value out of a [`Record`], what kind of
//! values it holds and which interactions (fuzzy filtering, sorting) it supports.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::{GridError, Record, Result, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Numeric,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub id: String,
    /// Record cell key the value is read from.
    pub accessor: String,
    pub header: String,
    pub kind: ColumnKind,
    pub fuzzy: bool,
    pub sortable: bool,
    /// Default visibility; view state may override it.
    pub visible: bool,
}

impl ColumnDescriptor {
    fn col(id: &str, kind: ColumnKind) -> Self {
        Self {
            id: id.to_string(),
            accessor: id.to_string(),
            header: id.to_string(),
            kind,
            fuzzy: false,
            sortable: true,
            visible: true,
        }
    }

    pub fn text(id: &str) -> Self { Self::col(id, ColumnKind::Text) }
    pub fn numeric(id: &str) -> Self { Self::col(id, ColumnKind::Numeric) }

    pub fn fuzzy(mut self) -> Self { self.fuzzy = true; self }
    pub fn header(mut self, header: &str) -> Self { self.header = header.to_string(); self }
    pub fn accessor(mut self, key: &str) -> Self { self.accessor = key.to_string(); self }
    pub fn unsortable(mut self) -> Self { self.sortable = false; self }
    pub fn hidden(mut self) -> Self { self.visible = false; self }

    pub fn is_numeric(&self) -> bool { self.kind == ColumnKind::Numeric }

    pub fn value<'r>(&self, record: &'r Record) -> Option<&'r Value> { record.get(&self.accessor) }
}

/// Look up a column by id, returning its position in the descriptor list.
pub fn find_column<'c>(columns: &'c [ColumnDescriptor], id: &str) -> Result<(usize, &'c ColumnDescriptor)> {
    columns
        .iter()
        .enumerate()
        .find(|(_, c)| c.id == id)
        .ok_or_else(|| GridError::UnknownColumn(id.to_string()))
}

pub fn column_index(columns: &[ColumnDescriptor], id: &str) -> Option<usize> {
    columns.iter().position(|c| c.id == id)
}

/// Reject descriptor lists with duplicate ids.
pub fn validate_columns(columns: &[ColumnDescriptor]) -> Result<()> {
    for (i, c) in columns.iter().enumerate() {
        if columns[..i].iter().any(|p| p.id == c.id) {
            return Err(GridError::DuplicateColumn(c.id.clone()));
        }
    }
    Ok(())
}

/// Check that every present cell of `record` matches its column's kind.
pub fn validate_record(columns: &[ColumnDescriptor], record: &Record) -> Result<()> {
    for c in columns {
        if let Some(v) = c.value(record) {
            if v.kind() != c.kind {
                return Err(GridError::ValueKindMismatch { record: record.id.0, column: c.id.clone() });
            }
        }
    }
    Ok(())
}
