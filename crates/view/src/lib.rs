//! Tabula view stages that run after filtering: sorting, facets and pagination.

#![forbid(unsafe_code)]

pub mod facet;
pub mod paginate;
pub mod sort;

pub use facet::{facet, min_max, unique_values, Facet, FacetValue};
pub use paginate::{can_next, can_previous, page_count, page_window, slice, PageItem, PageSlice};
pub use sort::{compare_alphanumeric, compare_values, sort};
