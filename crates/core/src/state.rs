//! View state: the only mutable input of the engine.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{ColumnDescriptor, ColumnKind, GridError, Result};

/// Per-column filter value, keyed by column kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterValue {
    Text(String),
    /// Closed interval `[lo, hi]`.
    Range { lo: f64, hi: f64 },
}

impl FilterValue {
    pub fn text(q: impl Into<String>) -> Self { FilterValue::Text(q.into()) }
    pub fn range(lo: f64, hi: f64) -> Self { FilterValue::Range { lo, hi } }

    /// Empty text filters carry no constraint.
    pub fn is_empty(&self) -> bool {
        matches!(self, FilterValue::Text(q) if q.is_empty())
    }

    pub fn validate(&self, column: &ColumnDescriptor) -> Result<()> {
        match (self, column.kind) {
            (FilterValue::Text(_), ColumnKind::Text) => Ok(()),
            (FilterValue::Range { lo, hi }, ColumnKind::Numeric) => {
                if lo.is_nan() || hi.is_nan() || lo > hi {
                    Err(GridError::InvalidRange { column: column.id.clone(), lo: *lo, hi: *hi })
                } else {
                    Ok(())
                }
            }
            (_, expected) => Err(GridError::FilterKindMismatch { column: column.id.clone(), expected }),
        }
    }
}

pub type FilterSpec = BTreeMap<String, FilterValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub column: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(column: &str) -> Self { Self { column: column.to_string(), direction: SortDirection::Asc } }
    pub fn desc(column: &str) -> Self { Self { column: column.to_string(), direction: SortDirection::Desc } }
}

pub type SortSpec = Vec<SortKey>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    #[serde(default)]
    pub filters: FilterSpec,
    #[serde(default)]
    pub global_filter: Option<String>,
    #[serde(default)]
    pub sort: SortSpec,
    #[serde(default)]
    pub page_index: usize,
    pub page_size: usize,
    #[serde(default)]
    pub column_visibility: BTreeMap<String, bool>,
}

impl ViewState {
    pub fn new(page_size: usize) -> Self {
        Self {
            filters: FilterSpec::new(),
            global_filter: None,
            sort: SortSpec::new(),
            page_index: 0,
            page_size,
            column_visibility: BTreeMap::new(),
        }
    }

    /// Visibility override if set, else the descriptor's default.
    pub fn is_visible(&self, column: &ColumnDescriptor) -> bool {
        self.column_visibility.get(&column.id).copied().unwrap_or(column.visible)
    }

    /// Global query, if one is set and non-empty.
    pub fn global_query(&self) -> Option<&str> {
        self.global_filter.as_deref().filter(|q| !q.is_empty())
    }
}

impl Default for ViewState {
    fn default() -> Self { Self::new(EngineConfig::default().default_page_size) }
}

/// Engine tunables. `TABULA_PAGE_SIZE` and `TABULA_WINDOW_RADIUS` override the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub default_page_size: usize,
    pub window_radius: usize,
}

impl Default for EngineConfig {
    fn default() -> Self { Self { default_page_size: 5, window_radius: 2 } }
}

impl EngineConfig {
    pub fn from_env() -> Self { Self::from_vars(|k| std::env::var(k).ok()) }

    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(raw) = get("TABULA_PAGE_SIZE") {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => cfg.default_page_size = n,
                _ => warn!(value = %raw, "invalid TABULA_PAGE_SIZE; expected a positive integer"),
            }
        }
        if let Some(raw) = get("TABULA_WINDOW_RADIUS") {
            match raw.parse::<usize>() {
                Ok(n) => cfg.window_radius = n,
                Err(_) => warn!(value = %raw, "invalid TABULA_WINDOW_RADIUS; expected a non-negative integer"),
            }
        }
        cfg
    }
}
