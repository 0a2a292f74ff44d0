#![forbid(unsafe_code)]

use thiserror::Error;

use crate::ColumnKind;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridError {
    #[error("page size must be greater than zero")]
    InvalidPageSize,
    #[error("page {current} is outside 1..={total}")]
    PageOutOfRange { current: usize, total: usize },
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    #[error("filter for column {column} must be {expected:?}")]
    FilterKindMismatch { column: String, expected: ColumnKind },
    #[error("invalid range for column {column}: [{lo}, {hi}]")]
    InvalidRange { column: String, lo: f64, hi: f64 },
    #[error("duplicate record id: {0}")]
    DuplicateRecordId(u64),
    #[error("duplicate column id: {0}")]
    DuplicateColumn(String),
    #[error("record {record} has a value of the wrong kind for column {column}")]
    ValueKindMismatch { record: u64, column: String },
}

impl GridError {
    /// Every variant describes caller input the engine refuses to act on.
    pub fn is_invalid_configuration(&self) -> bool {
        match self {
            GridError::InvalidPageSize
            | GridError::PageOutOfRange { .. }
            | GridError::UnknownColumn(_)
            | GridError::FilterKindMismatch { .. }
            | GridError::InvalidRange { .. }
            | GridError::DuplicateRecordId(_)
            | GridError::DuplicateColumn(_)
            | GridError::ValueKindMismatch { .. } => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, GridError>;
