//! Pagination types for large result sets.
//!
//! [`PaginationParams`] names a 1-indexed page and a page size;
//! [`Page`] carries one page of results along with the total count and
//! next/previous page numbers for navigation.

use serde::{Deserialize, Serialize};
use std::cmp::min;

/// A single page of paginated results.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The items contained in this page.
    pub items: Vec<T>,
    /// Total count of items across all pages.
    pub total: usize,
    /// The next page number, when more pages exist.
    pub next_page: Option<usize>,
    /// The previous page number, when this is not the first page.
    pub previous_page: Option<usize>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            next_page: None,
            previous_page: None,
        }
    }
}

/// Parameters for paginating through a result set. Pages are 1-indexed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PaginationParams {
    /// The page number (1-indexed).
    pub page: usize,
    /// Number of items per page.
    pub per_page: usize,
}

impl PaginationParams {
    /// Creates new pagination parameters.
    pub fn new(page: usize, per_page: usize) -> Self {
        Self { page, per_page }
    }

    /// The number of items to skip for this page.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1) * self.per_page
    }

    /// Slices one page out of a full result set, filling in navigation
    /// metadata. A page beyond the end comes back empty but keeps the total
    /// count.
    pub fn paginate<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len();
        let start = min(self.offset(), total);
        let end = min(start + self.per_page, total);

        let page_items = items
            .into_iter()
            .skip(start)
            .take(end - start)
            .collect::<Vec<_>>();

        Page {
            items: page_items,
            total,
            next_page: (end < total).then(|| self.page + 1),
            previous_page: (self.page > 1).then(|| self.page - 1),
        }
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginate_slices_and_links_pages() {
        let items: Vec<i32> = (1..=25).collect();

        let page = PaginationParams::new(2, 10).paginate(items.clone());
        assert_eq!(page.items, (11..=20).collect::<Vec<_>>());
        assert_eq!(page.total, 25);
        assert_eq!(page.next_page, Some(3));
        assert_eq!(page.previous_page, Some(1));

        let last = PaginationParams::new(3, 10).paginate(items.clone());
        assert_eq!(last.items.len(), 5);
        assert_eq!(last.next_page, None);

        let beyond = PaginationParams::new(9, 10).paginate(items);
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 25);
    }
}
