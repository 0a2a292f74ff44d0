//! Tabula engine façade (in-process).
//!
//! [`Engine`] owns a frozen [`RecordSet`], the column descriptors and the single
//! [`ViewState`]. Mutations go through its methods and are validated before anything
//! changes; queries recompute filter → sort → paginate from scratch on every call, so two
//! engines holding equal inputs always answer identically.

#![forbid(unsafe_code)]

use std::time::Instant;

use serde::Serialize;
use tabula_core::columns::{find_column, validate_columns};
use tabula_core::{
    ColumnDescriptor, EngineConfig, FilterValue, GridError, Record, RecordId, Result, SortDirection, SortKey,
    SortSpec, Value, ViewState,
};
use tabula_search::{filter, pre_filter, validate_filters};
use tabula_view::{can_next, can_previous, page_count, slice, sort, Facet, FacetValue, PageItem};
use tracing::{debug, info, warn};

pub use tabula_store::RecordSet;

/// One row of a page, projected to the visible columns. `cells[i]` belongs to
/// `PageView::columns[i]`; a missing cell is `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowView {
    pub id: RecordId,
    pub cells: Vec<Option<Value>>,
}

/// The current page as a presentation layer renders it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageView {
    /// Effective 0-based page index (after clamping).
    pub index: usize,
    pub page_count: usize,
    /// Rows passing every filter, across all pages.
    pub total_rows: usize,
    pub can_previous: bool,
    pub can_next: bool,
    /// Ids of the visible columns, in descriptor order.
    pub columns: Vec<String>,
    pub rows: Vec<RowView>,
}

#[derive(Debug, Clone)]
pub struct Engine {
    records: RecordSet,
    columns: Vec<ColumnDescriptor>,
    state: ViewState,
    config: EngineConfig,
}

impl Engine {
    /// Engine with default configuration. Fails when descriptors repeat an id or a record
    /// holds a value of the wrong kind for its column.
    pub fn new(records: RecordSet, columns: Vec<ColumnDescriptor>) -> Result<Self> {
        Self::with_config(records, columns, EngineConfig::default())
    }

    pub fn with_config(records: RecordSet, columns: Vec<ColumnDescriptor>, config: EngineConfig) -> Result<Self> {
        if config.default_page_size == 0 {
            return Err(GridError::InvalidPageSize);
        }
        validate_columns(&columns)?;
        records.validate(&columns)?;
        info!(records = records.len(), columns = columns.len(), page_size = config.default_page_size, "engine ready");
        Ok(Self { records, columns, state: ViewState::new(config.default_page_size), config })
    }

    pub fn records(&self) -> &RecordSet { &self.records }
    pub fn columns(&self) -> &[ColumnDescriptor] { &self.columns }
    pub fn config(&self) -> &EngineConfig { &self.config }
    pub fn view_state(&self) -> &ViewState { &self.state }

    // ----------------- Mutations -----------------

    /// Set the filter of `column`. An empty text query clears it instead.
    pub fn set_filter(&mut self, column: &str, value: FilterValue) -> Result<()> {
        let (_, col) = find_column(&self.columns, column)?;
        value.validate(col)?;
        if value.is_empty() {
            self.clear_filter(column)?;
            return Ok(());
        }
        debug!(column, ?value, "filter set");
        self.state.filters.insert(column.to_string(), value);
        self.state.page_index = 0;
        Ok(())
    }

    /// Drop the filter of `column`. Returns whether one was set.
    pub fn clear_filter(&mut self, column: &str) -> Result<bool> {
        find_column(&self.columns, column)?;
        let removed = self.state.filters.remove(column).is_some();
        if removed {
            debug!(column, "filter cleared");
            self.state.page_index = 0;
        }
        Ok(removed)
    }

    /// Query matched against every fuzzy text column. Empty clears it.
    pub fn set_global_filter(&mut self, query: &str) {
        self.state.global_filter = (!query.is_empty()).then(|| query.to_string());
        self.state.page_index = 0;
        debug!(query, "global filter set");
    }

    /// Drop every column filter and the global filter.
    pub fn clear_filters(&mut self) {
        self.state.filters.clear();
        self.state.global_filter = None;
        self.state.page_index = 0;
    }

    /// Replace the sort keys. Every key must name a known column; unsortable columns are
    /// kept but have no effect on the order.
    pub fn set_sort(&mut self, spec: SortSpec) -> Result<()> {
        for k in spec.iter() {
            find_column(&self.columns, &k.column)?;
        }
        self.state.sort = spec;
        self.state.page_index = 0;
        Ok(())
    }

    /// Sort by `column` in `direction`, as a column menu's "ascending"/"descending" item does.
    /// Without `multi` the sort becomes this column alone. With `multi` the column is appended
    /// as a further key, or changes direction in place if already sorted. Repeating a call
    /// leaves the sort as it is.
    pub fn toggle_sort(&mut self, column: &str, direction: SortDirection, multi: bool) -> Result<()> {
        let (_, col) = find_column(&self.columns, column)?;
        if !col.sortable {
            warn!(column, "toggle_sort on unsortable column; ignored");
            return Ok(());
        }
        let key = SortKey { column: column.to_string(), direction };
        if !multi {
            self.state.sort = vec![key];
        } else {
            match self.state.sort.iter_mut().find(|k| k.column == column) {
                Some(existing) => existing.direction = direction,
                None => self.state.sort.push(key),
            }
        }
        self.state.page_index = 0;
        Ok(())
    }

    /// Jump to `index`, clamped to the last page. Returns the index now in effect.
    pub fn set_page(&mut self, index: usize) -> usize {
        let count = self.page_count();
        self.state.page_index = index.min(count.saturating_sub(1));
        self.state.page_index
    }

    /// Advance one page if there is one. Returns whether the page changed.
    pub fn next_page(&mut self) -> bool {
        let count = self.page_count();
        let current = self.effective_index(count);
        if !can_next(current, count) {
            return false;
        }
        self.state.page_index = current + 1;
        true
    }

    pub fn previous_page(&mut self) -> bool {
        let current = self.effective_index(self.page_count());
        if !can_previous(current) {
            return false;
        }
        self.state.page_index = current - 1;
        true
    }

    /// Change the page size, keeping the first row of the current page in view.
    pub fn set_page_size(&mut self, page_size: usize) -> Result<()> {
        if page_size == 0 {
            return Err(GridError::InvalidPageSize);
        }
        let top = self.effective_index(self.page_count()) * self.state.page_size;
        self.state.page_size = page_size;
        self.state.page_index = top / page_size;
        Ok(())
    }

    pub fn set_column_visibility(&mut self, column: &str, visible: bool) -> Result<()> {
        find_column(&self.columns, column)?;
        self.state.column_visibility.insert(column.to_string(), visible);
        Ok(())
    }

    /// Replace the whole view state, e.g. one saved with serde. Nothing changes unless the
    /// state is valid for these columns.
    pub fn restore(&mut self, state: ViewState) -> Result<()> {
        if state.page_size == 0 {
            return Err(GridError::InvalidPageSize);
        }
        validate_filters(&self.columns, &state.filters)?;
        for k in state.sort.iter() {
            find_column(&self.columns, &k.column)?;
        }
        for id in state.column_visibility.keys() {
            find_column(&self.columns, id)?;
        }
        info!(filters = state.filters.len(), sort_keys = state.sort.len(), page = state.page_index, "view state restored");
        self.state = state;
        Ok(())
    }

    // ----------------- Queries -----------------

    fn effective_index(&self, count: usize) -> usize { self.state.page_index.min(count.saturating_sub(1)) }

    /// Filtered and sorted rows, all pages.
    pub fn rows(&self) -> Vec<&Record> {
        let filtered = filter(self.records.rows(), &self.columns, &self.state.filters, self.state.global_query());
        sort(&filtered.rows, &self.columns, &self.state.sort, &filtered.ranks)
    }

    pub fn total_filtered_count(&self) -> usize {
        filter(self.records.rows(), &self.columns, &self.state.filters, self.state.global_query()).rows.len()
    }

    pub fn page_count(&self) -> usize { page_count(self.total_filtered_count(), self.state.page_size) }

    pub fn visible_columns(&self) -> Vec<&ColumnDescriptor> {
        self.columns.iter().filter(|c| self.state.is_visible(c)).collect()
    }

    /// The current page, projected to the visible columns.
    pub fn page(&self) -> Result<PageView> {
        let t0 = Instant::now();
        let ordered = self.rows();
        let page = slice(&ordered, self.state.page_index, self.state.page_size)?;
        let visible = self.visible_columns();
        let rows = page
            .items
            .iter()
            .map(|r| RowView { id: r.id, cells: visible.iter().map(|c| c.value(r).cloned()).collect() })
            .collect();
        let view = PageView {
            index: page.index,
            page_count: page.count,
            total_rows: ordered.len(),
            can_previous: can_previous(page.index),
            can_next: can_next(page.index, page.count),
            columns: visible.iter().map(|c| c.id.clone()).collect(),
            rows,
        };
        metrics::histogram!("page_eval_ms", t0.elapsed().as_secs_f64() * 1_000.0);
        debug!(index = view.index, page_count = view.page_count, total = view.total_rows, "page computed");
        Ok(view)
    }

    // Rows passing every constraint except the filter on `column`.
    fn facet_rows(&self, column: &str) -> Vec<&Record> {
        pre_filter(self.records.rows(), &self.columns, &self.state.filters, self.state.global_query(), column)
    }

    /// Facet of `column` over the rows its own filter would not remove.
    pub fn facet(&self, column: &str) -> Result<Facet> {
        let (_, col) = find_column(&self.columns, column)?;
        Ok(tabula_view::facet(&self.facet_rows(column), col))
    }

    pub fn unique_values(&self, column: &str) -> Result<Vec<FacetValue>> {
        let (_, col) = find_column(&self.columns, column)?;
        Ok(tabula_view::unique_values(&self.facet_rows(column), col))
    }

    /// Numeric bounds of `column`, `None` for text columns or when no row has a value.
    pub fn min_max(&self, column: &str) -> Result<Option<(f64, f64)>> {
        let (_, col) = find_column(&self.columns, column)?;
        Ok(tabula_view::min_max(&self.facet_rows(column), col))
    }

    /// Page-number window around the current page. Empty when nothing passes the filters.
    pub fn page_window(&self, radius: usize) -> Result<Vec<PageItem>> {
        let count = self.page_count();
        tabula_view::page_window(self.effective_index(count) + 1, count, radius)
    }

    /// [`Engine::page_window`] with the configured radius.
    pub fn window(&self) -> Result<Vec<PageItem>> { self.page_window(self.config.window_radius) }
}
