//! Page arithmetic and result envelopes.

use serde::Serialize;

/// Pagination metadata.
///
/// `first_page` is always 1. A requested page past the end is clamped to the
/// last page when there are results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub total: u64,
    pub per_page: u64,
    pub current_page: u64,
    pub last_page: u64,
    pub first_page: u64,
}

impl PageMeta {
    pub fn new(total: u64, per_page: u64, page: u64) -> Self {
        let per_page = per_page.max(1);
        let last_page = total.div_ceil(per_page).max(1);
        let mut current_page = page.max(1);
        if total > 0 && current_page > last_page {
            current_page = last_page;
        }
        Self {
            total,
            per_page,
            current_page,
            last_page,
            first_page: 1,
        }
    }

    /// Rows to skip for the current page.
    pub fn offset(&self) -> u64 {
        (self.current_page - 1) * self.per_page
    }

    pub fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page
    }
}

/// `{ "data": [...], "pagination": {...} }`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: PageMeta,
}

/// `{ "data": [...], "search": {...} }`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults<T> {
    pub data: Vec<T>,
    pub search: PageMeta,
}
