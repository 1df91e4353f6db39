//! Deterministic client-side pagination.
//!
//! Slicing is a pure function of `(len, page_no, limit)`; the stateful part
//! only tracks the current page and limit and enforces their invariants
//! (pages are 1-based, a limit change always returns to page 1).

use std::ops::Range;

/// Result of slicing a dataset into one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSlice {
    /// Index range of the visible items, clamped to the dataset bounds.
    /// Empty when the page is past the end.
    pub range: Range<usize>,

    /// Total page count; 0 for an empty dataset
    pub total_pages: usize,
}

/// Slice a dataset of `len` items into the page at `page_no` (1-based).
///
/// Out-of-range pages yield an empty range rather than an error so the
/// caller can render an explicit "no data" state. Pure function: identical
/// inputs always produce identical output.
pub fn paginate(len: usize, page_no: usize, limit: usize) -> PageSlice {
    if len == 0 || limit == 0 {
        return PageSlice {
            range: 0..0,
            total_pages: 0,
        };
    }

    let page_no = page_no.max(1);
    let total_pages = len.div_ceil(limit);
    let start = (page_no - 1).saturating_mul(limit).min(len);
    let end = start.saturating_add(limit).min(len);

    PageSlice {
        range: start..end,
        total_pages,
    }
}

/// Current page and limit, with the list-view invariants enforced at the
/// mutation points rather than checked downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationState {
    page_no: usize,
    limit: usize,
}

impl PaginationState {
    pub fn new(limit: usize) -> Self {
        Self {
            page_no: 1,
            limit: limit.max(1),
        }
    }

    pub fn page_no(&self) -> usize {
        self.page_no
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Move to a page; pages below 1 are floored to 1. Upper-bound clamping
    /// is the controller's job since it depends on the filtered total.
    pub fn set_page(&mut self, page_no: usize) {
        self.page_no = page_no.max(1);
    }

    /// Change the page size. Always returns to page 1 before any
    /// recomputation happens.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.max(1);
        self.page_no = 1;
    }

    /// Return to page 1, as required after every fetch-triggering change.
    pub fn reset_page(&mut self) {
        self.page_no = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page_of_25() {
        // Scenario: 25 items, limit 10, page 1.
        let slice = paginate(25, 1, 10);
        assert_eq!(slice.range, 0..10);
        assert_eq!(slice.total_pages, 3);
    }

    #[test]
    fn test_short_last_page() {
        // Scenario: 25 items, limit 10, page 3 holds the trailing 5.
        let slice = paginate(25, 3, 10);
        assert_eq!(slice.range, 20..25);
        assert_eq!(slice.total_pages, 3);
    }

    #[test]
    fn test_empty_dataset() {
        let slice = paginate(0, 1, 10);
        assert_eq!(slice.range, 0..0);
        assert_eq!(slice.total_pages, 0);
    }

    #[test]
    fn test_page_past_the_end() {
        let slice = paginate(25, 7, 10);
        assert!(slice.range.is_empty());
        assert_eq!(slice.total_pages, 3);
    }

    #[test]
    fn test_exact_multiple() {
        let slice = paginate(40, 4, 10);
        assert_eq!(slice.range, 30..40);
        assert_eq!(slice.total_pages, 4);
    }

    #[test]
    fn test_visible_length_law() {
        // visible.len() == min(limit, max(0, len - (page-1)*limit))
        for len in [0usize, 1, 9, 10, 11, 25, 100] {
            for limit in [10usize, 20, 50] {
                for page in 1usize..=6 {
                    let slice = paginate(len, page, limit);
                    let expected = limit.min(len.saturating_sub((page - 1) * limit));
                    assert_eq!(
                        slice.range.len(),
                        expected,
                        "len={} page={} limit={}",
                        len,
                        page,
                        limit
                    );
                }
            }
        }
    }

    #[test]
    fn test_pure_and_idempotent() {
        assert_eq!(paginate(25, 2, 10), paginate(25, 2, 10));
    }

    #[test]
    fn test_zero_limit_guard() {
        let slice = paginate(25, 1, 0);
        assert!(slice.range.is_empty());
        assert_eq!(slice.total_pages, 0);
    }

    #[test]
    fn test_limit_change_resets_page() {
        let mut state = PaginationState::new(10);
        state.set_page(3);
        assert_eq!(state.page_no(), 3);

        state.set_limit(20);
        assert_eq!(state.page_no(), 1);
        assert_eq!(state.limit(), 20);
    }

    #[test]
    fn test_page_floor() {
        let mut state = PaginationState::new(10);
        state.set_page(0);
        assert_eq!(state.page_no(), 1);
    }
}
