use crate::query::QuerySignature;

pub const DEFAULT_PAGE_SIZE: usize = 60;

/// Visible window over a filtered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub visible: usize,
    pub total: usize,
    pub has_more: bool,
}

/// Tracks how many rows are visible for the current query signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    page_size: usize,
    visible_count: usize,
    last_signature: Option<QuerySignature>,
    known_total: Option<usize>,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Pagination {
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            page_size,
            visible_count: page_size,
            last_signature: None,
            known_total: None,
        }
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.visible_count
    }

    /// Resets to one page when `signature` differs from the last one seen.
    /// Returns whether a reset happened.
    pub fn on_query_change(&mut self, signature: &QuerySignature) -> bool {
        if self.last_signature.as_ref() == Some(signature) {
            return false;
        }
        self.visible_count = self.page_size;
        self.last_signature = Some(signature.clone());
        self.known_total = None;
        true
    }

    /// Records the filtered total of the latest pass so the visible count
    /// never runs past it. One page always stays reserved.
    pub fn observe_total(&mut self, total: usize) {
        self.known_total = Some(total);
        self.visible_count = self.clamped(self.visible_count);
    }

    fn clamped(&self, count: usize) -> usize {
        match self.known_total {
            Some(total) => count.min(total.max(self.page_size)),
            None => count,
        }
    }

    pub fn load_more(&mut self) -> usize {
        self.load_more_by(self.page_size)
    }

    /// Grows by `increment` rows; zero falls back to one page.
    pub fn load_more_by(&mut self, increment: usize) -> usize {
        let increment = if increment == 0 {
            self.page_size
        } else {
            increment
        };
        self.visible_count = self.clamped(self.visible_count.saturating_add(increment));
        self.visible_count
    }

    #[must_use]
    pub fn window(&self, total: usize) -> PageWindow {
        let visible = self.visible_count.min(total);
        PageWindow {
            visible,
            total,
            has_more: visible < total,
        }
    }

    #[must_use]
    pub fn slice<'a, T>(&self, rows: &'a [T]) -> &'a [T] {
        &rows[..self.window(rows.len()).visible]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{QueryCriteria, QuickFilter};

    #[test]
    fn load_more_clamps_to_the_filtered_total() {
        let rows: Vec<u32> = (0..130).collect();
        let mut paging = Pagination::new(60);
        paging.on_query_change(&QueryCriteria::default().signature());
        paging.observe_total(rows.len());

        let window = paging.window(rows.len());
        assert_eq!(window.visible, 60);
        assert!(window.has_more);

        assert_eq!(paging.load_more(), 120);
        assert_eq!(paging.slice(&rows).len(), 120);
        assert!(paging.window(rows.len()).has_more);

        assert_eq!(paging.load_more(), 130);
        assert_eq!(paging.visible_count(), 130);
        let window = paging.window(rows.len());
        assert_eq!(window.visible, 130);
        assert!(!window.has_more);
        assert_eq!(paging.slice(&rows).len(), 130);
    }

    #[test]
    fn same_signature_keeps_the_grown_window() {
        let criteria = QueryCriteria::default();
        let mut paging = Pagination::new(10);
        assert!(paging.on_query_change(&criteria.signature()));
        paging.load_more();
        assert!(!paging.on_query_change(&criteria.signature()));
        assert_eq!(paging.visible_count(), 20);

        let changed = QueryCriteria {
            quick: QuickFilter::OpenOnly,
            ..criteria
        };
        assert!(paging.on_query_change(&changed.signature()));
        assert_eq!(paging.visible_count(), 10);
    }

    #[test]
    fn short_results_keep_one_full_page() {
        let mut paging = Pagination::new(60);
        paging.on_query_change(&QueryCriteria::default().signature());
        paging.observe_total(10);
        assert_eq!(paging.visible_count(), 60);
        assert_eq!(paging.load_more(), 60);

        paging.observe_total(100);
        assert_eq!(paging.load_more(), 100);
        assert!(!paging.window(100).has_more);
    }

    #[test]
    fn zero_page_size_is_clamped() {
        let mut paging = Pagination::new(0);
        assert_eq!(paging.page_size(), 1);
        assert_eq!(paging.load_more_by(0), 2);
        assert_eq!(paging.load_more_by(5), 7);
    }
}
