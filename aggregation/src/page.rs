use serde::Serialize;

use crate::error::{AggregationError, Result};

/// Viewport width tiers for list views: `(exclusive upper bound, page size)`.
/// Widths at or above the last bound use [`WIDEST_PAGE_SIZE`].
const PAGE_SIZE_TIERS: &[(u32, usize)] = &[(1024, 2), (1280, 3)];
const WIDEST_PAGE_SIZE: usize = 4;

/// One page of an ordered sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-indexed.
    pub page_number: usize,
    pub page_size: usize,
    pub total_pages: usize,
    /// Position of `items[0]` in the full sequence.
    pub offset: usize,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.page_number > 1
    }

    pub fn has_next(&self) -> bool {
        self.page_number < self.total_pages
    }
}

/// Slices page `page_number` (1-indexed) out of `items`.
///
/// `total_pages` is `ceil(len / page_size)`, so an empty sequence has zero
/// pages. Asking for a page past the end returns an empty page rather than
/// an error.
pub fn paginate<T: Clone>(items: &[T], page_number: usize, page_size: usize) -> Result<Page<T>> {
    if page_size == 0 {
        return Err(AggregationError::ZeroPageSize);
    }
    if page_number == 0 {
        return Err(AggregationError::ZeroPageNumber);
    }

    let total_pages = items.len().div_ceil(page_size);
    let offset = (page_number - 1).saturating_mul(page_size);
    let page_items = items
        .iter()
        .skip(offset)
        .take(page_size)
        .cloned()
        .collect();

    Ok(Page {
        items: page_items,
        page_number,
        page_size,
        total_pages,
        offset,
    })
}

/// Page size for a list view rendered at `viewport_width` CSS pixels.
///
/// Tiers are half-open: `[0, 1024) → 2`, `[1024, 1280) → 3`, `[1280, ∞) → 4`.
pub fn page_size_for(viewport_width: u32) -> usize {
    PAGE_SIZE_TIERS
        .iter()
        .find(|&&(upper, _)| viewport_width < upper)
        .map_or(WIDEST_PAGE_SIZE, |&(_, size)| size)
}
