//! Page slicing and the compressed page-number window shown by pagination controls.

#![forbid(unsafe_code)]

use serde::Serialize;
use tabula_core::{GridError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageItem {
    /// 1-based page number.
    Page(usize),
    Ellipsis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSlice<'a, T> {
    /// Effective 0-based index after clamping.
    pub index: usize,
    pub count: usize,
    pub items: &'a [T],
}

pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 { 0 } else { total.div_ceil(page_size) }
}

/// Cut page `page_index` out of `items`. Indices past the end clamp to the last page.
pub fn slice<T>(items: &[T], page_index: usize, page_size: usize) -> Result<PageSlice<'_, T>> {
    if page_size == 0 {
        return Err(GridError::InvalidPageSize);
    }
    let count = page_count(items.len(), page_size);
    let index = page_index.min(count.saturating_sub(1));
    let start = (index * page_size).min(items.len());
    let end = start.saturating_add(page_size).min(items.len());
    Ok(PageSlice { index, count, items: &items[start..end] })
}

pub fn can_previous(page_index: usize) -> bool { page_index > 0 }

pub fn can_next(page_index: usize, page_count: usize) -> bool { page_index + 1 < page_count }

/// Page numbers around `current` (1-based) plus the first and last page, with skipped
/// runs collapsed into a single [`PageItem::Ellipsis`].
///
/// `page_window(5, 10, 2)` is `[1, …, 3, 4, 5, 6, 7, …, 10]`.
pub fn page_window(current: usize, total: usize, radius: usize) -> Result<Vec<PageItem>> {
    if total == 0 {
        return Ok(Vec::new());
    }
    if current == 0 || current > total {
        return Err(GridError::PageOutOfRange { current, total });
    }
    let left = current.saturating_sub(radius);
    let right = current.saturating_add(radius);
    let mut out = Vec::with_capacity(radius.saturating_mul(2).saturating_add(5).min(total.saturating_add(2)));
    out.push(PageItem::Page(1));
    if left > 2 {
        out.push(PageItem::Ellipsis);
    }
    let inner_lo = left.max(2);
    let inner_hi = right.min(total - 1);
    if inner_lo <= inner_hi {
        out.extend((inner_lo..=inner_hi).map(PageItem::Page));
    }
    if right < total.saturating_sub(1) {
        out.push(PageItem::Ellipsis);
    }
    if total > 1 {
        out.push(PageItem::Page(total));
    }
    Ok(out)
}
