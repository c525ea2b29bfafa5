use crate::paging::{PageWindow, Pagination};
use crate::profile::ModuleProfile;
use crate::query::{QueryCriteria, QuerySignature, QuickFilter, apply_query, is_overdue};
use crate::record::ListRecord;
use crate::render::{RenderToken, RenderTokens};

/// Counts shown in the summary strip, taken over the unfiltered base rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSummary {
    pub total: usize,
    pub open: usize,
    pub overdue: usize,
    pub by_status: Vec<(&'static str, usize)>,
}

impl ListSummary {
    pub fn collect<R: ListRecord>(
        rows: &[R],
        profile: &'static ModuleProfile,
        today: &str,
    ) -> Self {
        let by_status = profile
            .statuses
            .iter()
            .map(|status| {
                let count = rows.iter().filter(|row| row.status() == *status).count();
                (*status, count)
            })
            .collect();
        Self {
            total: rows.len(),
            open: rows.iter().filter(|row| profile.is_open(row.status())).count(),
            overdue: rows
                .iter()
                .filter(|row| is_overdue(*row, profile, today))
                .count(),
            by_status,
        }
    }

    #[must_use]
    pub fn count_for(&self, status: &str) -> usize {
        self.by_status
            .iter()
            .find(|(candidate, _)| *candidate == status)
            .map_or(0, |(_, count)| *count)
    }
}

/// Everything one update cycle needs to paint.
#[derive(Debug)]
pub struct ListRenderPlan<'a, R> {
    pub token: RenderToken,
    pub signature: QuerySignature,
    pub pagination_reset: bool,
    pub visible: Vec<&'a R>,
    pub window: PageWindow,
    pub summary: ListSummary,
}

/// Session-scoped list state for one module view.
#[derive(Debug, Clone)]
pub struct ListSession {
    profile: &'static ModuleProfile,
    applied: QueryCriteria,
    pending: QueryCriteria,
    paging: Pagination,
    tokens: RenderTokens,
    filters_open: bool,
}

impl ListSession {
    #[must_use]
    pub fn new(profile: &'static ModuleProfile, page_size: usize) -> Self {
        let criteria = QueryCriteria::for_profile(profile);
        Self {
            profile,
            applied: criteria.clone(),
            pending: criteria,
            paging: Pagination::new(page_size),
            tokens: RenderTokens::new(),
            filters_open: false,
        }
    }

    #[must_use]
    pub fn profile(&self) -> &'static ModuleProfile {
        self.profile
    }

    #[must_use]
    pub fn criteria(&self) -> &QueryCriteria {
        &self.applied
    }

    #[must_use]
    pub fn pending(&self) -> &QueryCriteria {
        &self.pending
    }

    /// Draft criteria edited by the filter panel; inert until applied.
    pub fn pending_mut(&mut self) -> &mut QueryCriteria {
        &mut self.pending
    }

    #[must_use]
    pub fn tokens(&self) -> &RenderTokens {
        &self.tokens
    }

    #[must_use]
    pub fn pagination(&self) -> &Pagination {
        &self.paging
    }

    /// Applies immediately and mirrors into the pending criteria.
    pub fn set_quick_filter(&mut self, quick: QuickFilter) {
        self.pending.quick = quick.clone();
        self.applied.quick = quick;
    }

    pub fn apply_pending(&mut self) {
        let mut next = self.pending.clone();
        next.search_text = next.search_text.trim().to_string();
        if !self.profile.supports_sort(next.sort) {
            next.sort = crate::query::SortKey::default();
        }
        self.pending = next.clone();
        self.applied = next;
    }

    /// Applies the advanced filters and sort without touching the search text.
    pub fn apply_advanced(&mut self) {
        let search_text = self.applied.search_text.clone();
        self.apply_pending();
        self.applied.search_text = search_text;
    }

    pub fn clear_all(&mut self) {
        let criteria = QueryCriteria::for_profile(self.profile);
        self.pending = criteria.clone();
        self.applied = criteria;
    }

    pub fn load_more(&mut self) -> usize {
        self.paging.load_more()
    }

    #[must_use]
    pub fn filters_open(&self) -> bool {
        self.filters_open
    }

    pub fn set_filters_open(&mut self, open: bool) {
        self.filters_open = open;
    }

    pub fn toggle_filters(&mut self) -> bool {
        self.filters_open = !self.filters_open;
        self.filters_open
    }

    /// Issues the token of a new update cycle before its rows are fetched.
    /// Any in-flight cycle is superseded from here on.
    pub fn begin_fetch(&self) -> RenderToken {
        self.tokens.begin_render()
    }

    /// Adopts the rows fetched for `token` and plans its pass.
    ///
    /// A fetch that resolves after a newer cycle began returns `None` and
    /// leaves `rows` untouched. A failed fetch (`None`) plans over the rows
    /// already held.
    pub fn plan_fetched<'a, R: ListRecord>(
        &mut self,
        token: RenderToken,
        rows: &'a mut Vec<R>,
        fetched: Option<Vec<R>>,
        today: &str,
    ) -> Option<ListRenderPlan<'a, R>> {
        if !self.tokens.is_current(token) {
            return None;
        }
        if let Some(fetched) = fetched {
            *rows = fetched;
        }
        let base: &'a Vec<R> = rows;
        Some(self.plan_for(token, base, today))
    }

    /// Signature check, pagination, pipeline, then a fresh render token.
    pub fn plan_update<'a, R: ListRecord>(
        &mut self,
        base: &'a [R],
        today: &str,
    ) -> ListRenderPlan<'a, R> {
        let token = self.begin_fetch();
        self.plan_for(token, base, today)
    }

    fn plan_for<'a, R: ListRecord>(
        &mut self,
        token: RenderToken,
        base: &'a [R],
        today: &str,
    ) -> ListRenderPlan<'a, R> {
        let signature = self.applied.signature();
        let pagination_reset = self.paging.on_query_change(&signature);
        let mut visible = apply_query(base, &self.applied, self.profile, today);
        self.paging.observe_total(visible.len());
        let window = self.paging.window(visible.len());
        visible.truncate(window.visible);
        ListRenderPlan {
            token,
            signature,
            pagination_reset,
            visible,
            window,
            summary: ListSummary::collect(base, self.profile, today),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{ORDERS, QUOTES};
    use crate::query::SortKey;
    use crate::record::{OrderRecord, QuoteRecord};

    fn orders(count: usize) -> Vec<OrderRecord> {
        (0..count)
            .map(|index| OrderRecord {
                id: format!("O{index:03}"),
                status: if index % 2 == 0 { "已下單" } else { "已結案" }.to_string(),
                expected_at: "2020-01-01".to_string(),
                ..OrderRecord::default()
            })
            .collect()
    }

    #[test]
    fn plan_pages_the_filtered_rows() {
        let rows = orders(130);
        let mut session = ListSession::new(&ORDERS, 60);

        let plan = session.plan_update(&rows, "2025-01-01");
        assert!(plan.pagination_reset);
        assert_eq!(plan.visible.len(), 60);
        assert!(plan.window.has_more);
        assert_eq!(plan.summary.total, 130);
        assert_eq!(plan.summary.open, 65);
        assert_eq!(plan.summary.overdue, 65);
        assert_eq!(plan.summary.count_for("已結案"), 65);

        session.load_more();
        let plan = session.plan_update(&rows, "2025-01-01");
        assert!(!plan.pagination_reset);
        assert_eq!(plan.visible.len(), 120);

        assert_eq!(session.load_more(), 130);
        let plan = session.plan_update(&rows, "2025-01-01");
        assert_eq!(plan.visible.len(), 130);
        assert!(!plan.window.has_more);
    }

    #[test]
    fn quick_filter_resets_paging_and_issues_a_new_token() {
        let rows = orders(130);
        let mut session = ListSession::new(&ORDERS, 60);
        let first = session.plan_update(&rows, "2025-01-01").token;
        session.load_more();

        session.set_quick_filter(QuickFilter::OpenOnly);
        let plan = session.plan_update(&rows, "2025-01-01");
        assert!(plan.pagination_reset);
        assert_eq!(plan.window.total, 65);
        assert_eq!(plan.visible.len(), 60);
        assert!(plan.token > first);
        assert!(!session.tokens().is_current(first));
        assert_eq!(session.pending().quick, QuickFilter::OpenOnly);
    }

    #[test]
    fn pending_edits_are_inert_until_applied() {
        let mut session = ListSession::new(&ORDERS, 60);
        session.pending_mut().amount.min = "100".to_string();
        session.pending_mut().search_text = "  acme ".to_string();
        assert!(session.criteria().amount.min.is_empty());

        session.apply_advanced();
        assert_eq!(session.criteria().amount.min, "100");
        assert!(session.criteria().search_text.is_empty());

        session.apply_pending();
        assert_eq!(session.criteria().search_text, "acme");

        session.clear_all();
        assert_eq!(session.criteria(), &QueryCriteria::for_profile(&ORDERS));
        assert_eq!(session.pending(), session.criteria());
    }

    #[test]
    fn unsupported_sort_falls_back_to_recent_updates() {
        let mut session = ListSession::new(&QUOTES, 60);
        session.pending_mut().sort = SortKey::AmountDesc;
        session.apply_pending();
        assert_eq!(session.criteria().sort, SortKey::AmountDesc);

        session.pending_mut().sort = SortKey::DateAsc(crate::record::DateField::Expected);
        session.apply_pending();
        assert_eq!(session.criteria().sort, SortKey::UpdatedDesc);

        let rows: Vec<QuoteRecord> = Vec::new();
        let plan = session.plan_update(&rows, "2025-01-01");
        assert!(!plan.window.has_more);
        assert_eq!(plan.summary.overdue, 0);
    }

    #[test]
    fn a_fetch_resolving_after_a_newer_one_is_dropped() {
        let mut session = ListSession::new(&ORDERS, 60);
        let mut rows = Vec::new();
        let slow = session.begin_fetch();
        let fast = session.begin_fetch();

        let plan = session
            .plan_fetched(fast, &mut rows, Some(orders(3)), "2025-01-01")
            .expect("current fetch");
        assert_eq!(plan.token, fast);
        assert_eq!(plan.visible.len(), 3);

        assert!(
            session
                .plan_fetched(slow, &mut rows, Some(orders(100)), "2025-01-01")
                .is_none()
        );
        assert_eq!(rows.len(), 3);
        assert!(session.tokens().is_current(fast));
    }

    #[test]
    fn a_failed_fetch_plans_over_the_cached_rows() {
        let mut session = ListSession::new(&ORDERS, 60);
        let mut rows = orders(5);
        let token = session.begin_fetch();
        let plan = session
            .plan_fetched(token, &mut rows, None, "2025-01-01")
            .expect("current fetch");
        assert_eq!(plan.window.total, 5);
    }

    #[test]
    fn filters_panel_toggles() {
        let mut session = ListSession::new(&ORDERS, 60);
        assert!(session.toggle_filters());
        assert!(!session.toggle_filters());
    }
}
