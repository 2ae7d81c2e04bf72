//! Search-Paginate controller shared by the patient and prescription lists.
//!
//! Two modes:
//! - **Browse**: the server pages the full list; every page or page-size
//!   change is a fetch.
//! - **Search**: one remote search returns the complete match set, which
//!   is held in memory and sliced locally.
//!
//! Keystrokes go through a [`Debouncer`]. Each issued search takes a
//! sequence number and a response is applied only if its number is still
//! the latest, so a slow early response can never overwrite a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use super::debounce::Debouncer;
use super::local_filter::{filter_local, Searchable};
use super::pagination::{is_valid_page, local_pagination, page_labels, slice_page, PageLabel};
use crate::api::ApiError;
use crate::config;
use crate::models::{Page, PaginationInfo};
use crate::notify::{Notification, Notifier};

/// Where a list view gets its records.
#[async_trait]
pub trait SearchSource: Send + Sync + 'static {
    type Item: Searchable + Clone + Send + Sync + 'static;

    /// One server page (browse mode).
    async fn fetch_page(&self, page: u32, limit: u32) -> Result<Page<Self::Item>, ApiError>;

    /// Complete match set for `query` (search mode).
    async fn search(&self, query: &str) -> Result<Vec<Self::Item>, ApiError>;

    /// Client-side narrowing applied to search and fallback results before
    /// they are stored. Browse pages are narrowed by the server.
    fn retain(&self, _item: &Self::Item) -> bool {
        true
    }
}

// ═══════════════════════════════════════════════════════════
// State
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
struct SearchState<T> {
    query: String,
    is_searching: bool,
    is_loading: bool,
    is_search_mode: bool,
    /// Current server page. Also the local fallback corpus.
    browse_items: Vec<T>,
    browse_pagination: PaginationInfo,
    /// Complete match set while in search mode.
    results: Vec<T>,
    current_page: u32,
    items_per_page: u32,
}

impl<T> SearchState<T> {
    fn new(items_per_page: u32) -> Self {
        Self {
            query: String::new(),
            is_searching: false,
            is_loading: false,
            is_search_mode: false,
            browse_items: Vec::new(),
            browse_pagination: PaginationInfo::empty(items_per_page),
            results: Vec::new(),
            current_page: 1,
            items_per_page,
        }
    }

    fn pagination(&self) -> PaginationInfo {
        if self.is_search_mode {
            local_pagination(self.results.len(), self.current_page, self.items_per_page)
        } else {
            self.browse_pagination
        }
    }
}

struct Inner<S: SearchSource> {
    source: S,
    notifier: Arc<dyn Notifier>,
    state: Mutex<SearchState<S::Item>>,
    search_seq: AtomicU64,
    browse_seq: AtomicU64,
    revision: watch::Sender<u64>,
}

impl<S: SearchSource> Inner<S> {
    fn lock(&self) -> MutexGuard<'_, SearchState<S::Item>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn changed(&self) {
        self.revision.send_modify(|r| *r = r.wrapping_add(1));
    }

    fn report(&self, title: &str, err: &ApiError) {
        if !err.is_reported_globally() {
            self.notifier.notify(Notification::error(
                title,
                err.user_message("Something went wrong. Please try again."),
            ));
        }
    }

    /// Invalidate any in-flight search.
    fn supersede_search(&self) {
        self.search_seq.fetch_add(1, Ordering::SeqCst);
    }

    // ── Browse mode ─────────────────────────────────────────

    async fn load_page(&self, page: u32, limit: u32) -> Result<(), ApiError> {
        let seq = self.browse_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.lock().is_loading = true;
        self.changed();

        let outcome = self.source.fetch_page(page, limit).await;

        {
            let mut state = self.lock();
            if self.browse_seq.load(Ordering::SeqCst) != seq {
                tracing::debug!(page, "Discarding superseded page response");
                return Ok(());
            }
            state.is_loading = false;
            match &outcome {
                Ok(fetched) => {
                    state.browse_items = fetched.items.clone();
                    state.browse_pagination = fetched.pagination;
                    if !state.is_search_mode {
                        state.current_page = page;
                        state.items_per_page = limit;
                    }
                }
                Err(e) => tracing::warn!(page, limit, error = %e, "Failed to load page"),
            }
        }
        self.changed();

        match outcome {
            Ok(_) => Ok(()),
            Err(e) => {
                self.report("Failed to Load", &e);
                Err(e)
            }
        }
    }

    /// Leave search mode and show page 1 of the full list.
    async fn resume_browse(&self) -> Result<(), ApiError> {
        self.supersede_search();
        let limit = {
            let mut state = self.lock();
            state.is_search_mode = false;
            state.is_searching = false;
            state.results.clear();
            state.current_page = 1;
            state.items_per_page
        };
        self.changed();
        self.load_page(1, limit).await
    }

    // ── Search mode ─────────────────────────────────────────

    async fn run_search(&self, query: String) {
        let seq = self.search_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.lock().is_searching = true;
        self.changed();
        tracing::debug!(%query, seq, "Issuing search");

        let outcome = self.source.search(&query).await;

        let empty = {
            let mut state = self.lock();
            if self.search_seq.load(Ordering::SeqCst) != seq {
                tracing::debug!(%query, seq, "Discarding stale search response");
                return;
            }
            let found = match outcome {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!(%query, error = %e, "Remote search failed, filtering loaded records");
                    filter_local(&state.browse_items, &query)
                }
            };
            state.results = found
                .into_iter()
                .filter(|item| self.source.retain(item))
                .collect();
            state.is_search_mode = true;
            state.is_searching = false;
            state.current_page = 1;
            state.results.is_empty()
        };
        self.changed();

        if empty {
            self.notifier.notify(Notification::NoSearchResults { query });
        }
    }

    /// Timer callback: act on whatever the query is now.
    async fn on_quiet(&self) {
        let query = self.lock().query.trim().to_string();
        if query.is_empty() {
            let was_searching = self.lock().is_search_mode;
            if was_searching {
                // Failure is already logged and reported by load_page.
                let _ = self.resume_browse().await;
            } else {
                // A first search may still be in flight.
                self.supersede_search();
                self.lock().is_searching = false;
                self.changed();
            }
        } else {
            self.run_search(query).await;
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Controller
// ═══════════════════════════════════════════════════════════

/// Debounced search plus pagination over one [`SearchSource`].
pub struct SearchController<S: SearchSource> {
    inner: Arc<Inner<S>>,
    debouncer: Debouncer,
}

impl<S: SearchSource> SearchController<S> {
    pub fn new(source: S, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_settings(
            source,
            notifier,
            config::SEARCH_DEBOUNCE,
            config::DEFAULT_PAGE_SIZE,
        )
    }

    pub fn with_settings(
        source: S,
        notifier: Arc<dyn Notifier>,
        debounce: Duration,
        items_per_page: u32,
    ) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                source,
                notifier,
                state: Mutex::new(SearchState::new(items_per_page.max(1))),
                search_seq: AtomicU64::new(0),
                browse_seq: AtomicU64::new(0),
                revision,
            }),
            debouncer: Debouncer::new(debounce),
        }
    }

    pub fn source(&self) -> &S {
        &self.inner.source
    }

    /// Bumped after every visible state change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    // ── Read ────────────────────────────────────────────────

    pub fn query(&self) -> String {
        self.inner.lock().query.clone()
    }

    pub fn is_search_mode(&self) -> bool {
        self.inner.lock().is_search_mode
    }

    pub fn is_searching(&self) -> bool {
        self.inner.lock().is_searching
    }

    pub fn is_loading(&self) -> bool {
        self.inner.lock().is_loading
    }

    pub fn current_page(&self) -> u32 {
        self.inner.lock().current_page
    }

    pub fn items_per_page(&self) -> u32 {
        self.inner.lock().items_per_page
    }

    pub fn pagination(&self) -> PaginationInfo {
        self.inner.lock().pagination()
    }

    pub fn page_labels(&self) -> Vec<PageLabel> {
        let info = self.pagination();
        page_labels(info.current_page, info.total_pages)
    }

    /// Records on the current page.
    pub fn visible_items(&self) -> Vec<S::Item> {
        let state = self.inner.lock();
        if state.is_search_mode {
            slice_page(&state.results, state.current_page, state.items_per_page).to_vec()
        } else {
            state.browse_items.clone()
        }
    }

    /// Whole match set in search mode; the loaded page otherwise.
    pub fn all_items(&self) -> Vec<S::Item> {
        let state = self.inner.lock();
        if state.is_search_mode {
            state.results.clone()
        } else {
            state.browse_items.clone()
        }
    }

    // ── Browse ──────────────────────────────────────────────

    /// First page of the full list.
    pub async fn load_initial(&self) -> Result<(), ApiError> {
        let limit = self.items_per_page();
        self.inner.load_page(1, limit).await
    }

    /// Go to `page`. Out-of-range pages are ignored. Search mode re-slices
    /// without a request.
    pub async fn set_page(&self, page: u32) -> Result<(), ApiError> {
        let (search_mode, limit) = {
            let mut state = self.inner.lock();
            let info = state.pagination();
            if !is_valid_page(page, info.total_pages) || page == state.current_page {
                return Ok(());
            }
            if state.is_search_mode {
                state.current_page = page;
            }
            (state.is_search_mode, state.items_per_page)
        };
        if search_mode {
            self.inner.changed();
            Ok(())
        } else {
            self.inner.load_page(page, limit).await
        }
    }

    pub async fn next_page(&self) -> Result<(), ApiError> {
        let page = self.current_page().saturating_add(1);
        self.set_page(page).await
    }

    pub async fn prev_page(&self) -> Result<(), ApiError> {
        let page = self.current_page().saturating_sub(1);
        self.set_page(page).await
    }

    /// Change the page size; always returns to page 1.
    ///
    /// In browse mode the new size only takes effect once page 1 at that
    /// size has loaded.
    pub async fn set_items_per_page(&self, limit: u32) -> Result<(), ApiError> {
        let limit = limit.max(1);
        let search_mode = {
            let mut state = self.inner.lock();
            if state.is_search_mode {
                state.items_per_page = limit;
                state.current_page = 1;
            }
            state.is_search_mode
        };
        if search_mode {
            self.inner.changed();
            Ok(())
        } else {
            self.inner.load_page(1, limit).await
        }
    }

    /// Re-run the active search, or re-fetch the current page.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let (search_mode, query, page, limit) = {
            let state = self.inner.lock();
            (
                state.is_search_mode,
                state.query.trim().to_string(),
                state.current_page,
                state.items_per_page,
            )
        };
        if search_mode && !query.is_empty() {
            self.inner.run_search(query).await;
            Ok(())
        } else {
            self.inner.load_page(page, limit).await
        }
    }

    /// Start over on page 1 of whichever mode is active (after a filter change).
    pub async fn reload_first_page(&self) -> Result<(), ApiError> {
        let (search_mode, query, limit) = {
            let mut state = self.inner.lock();
            state.current_page = 1;
            (
                state.is_search_mode,
                state.query.trim().to_string(),
                state.items_per_page,
            )
        };
        // Browse data backs the local fallback, so refresh it either way.
        let loaded = self.inner.load_page(1, limit).await;
        if search_mode && !query.is_empty() {
            self.inner.run_search(query).await;
        }
        loaded
    }

    // ── Search ──────────────────────────────────────────────

    /// Keystroke: show the new text at once, search after the quiet period.
    pub fn set_query(&self, query: impl Into<String>) {
        self.inner.lock().query = query.into();
        self.inner.changed();

        let inner = self.inner.clone();
        self.debouncer.schedule(async move {
            inner.on_quiet().await;
        });
    }

    /// Enter key: search now. An empty query is refused with a notice.
    pub async fn submit_query(&self) {
        self.debouncer.cancel();
        let query = self.query().trim().to_string();
        if query.is_empty() {
            self.inner.notifier.notify(Notification::warning(
                "Search Required",
                "Please enter a search term",
            ));
            return;
        }
        self.inner.run_search(query).await;
    }

    /// Escape / clear button: drop the query and return to page 1 of the list.
    pub async fn clear_search(&self) -> Result<(), ApiError> {
        self.debouncer.cancel();
        self.inner.lock().query.clear();
        self.inner.resume_browse().await
    }

    pub fn has_pending_search(&self) -> bool {
        self.debouncer.is_pending()
    }

    // ── Mutation ────────────────────────────────────────────

    /// Remove matching records from both the loaded page and the match set
    /// in one update. Returns how many distinct records were dropped from
    /// the visible mode.
    pub fn remove_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&S::Item) -> bool,
    {
        let removed = {
            let mut state = self.inner.lock();
            let before_browse = state.browse_items.len();
            state.browse_items.retain(|item| !predicate(item));
            let from_browse = before_browse - state.browse_items.len();

            let before_results = state.results.len();
            state.results.retain(|item| !predicate(item));
            let from_results = before_results - state.results.len();

            if from_browse > 0 {
                let info = state.browse_pagination;
                let total = info
                    .total_items
                    .saturating_sub(u32::try_from(from_browse).unwrap_or(u32::MAX));
                state.browse_pagination =
                    PaginationInfo::compute(info.current_page, total, info.limit);
            }

            let total_pages = state.pagination().total_pages.max(1);
            if state.current_page > total_pages {
                state.current_page = total_pages;
            }

            if state.is_search_mode {
                from_results
            } else {
                from_browse
            }
        };
        self.inner.changed();
        removed
    }

    /// Cancel pending work; responses still in flight are discarded.
    pub fn teardown(&self) {
        self.debouncer.cancel();
        self.inner.supersede_search();
        self.inner.browse_seq.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Search controller torn down");
    }
}

impl<S: SearchSource> Drop for SearchController<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MemoryNotifier;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicBool;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: String,
        name: String,
        phone: String,
        flagged: bool,
    }

    impl Searchable for Row {
        fn search_fields(&self) -> Vec<&str> {
            vec![self.id.as_str(), self.name.as_str(), self.phone.as_str()]
        }
    }

    fn row(id: u32, name: &str, phone: &str) -> Row {
        Row {
            id: format!("P{id:03}"),
            name: name.into(),
            phone: phone.into(),
            flagged: id % 2 == 0,
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Page(u32, u32),
        Search(String),
    }

    #[derive(Default)]
    struct MockSource {
        rows: Vec<Row>,
        calls: Mutex<Vec<Call>>,
        fail_search: AtomicBool,
        fail_pages: AtomicBool,
        only_flagged: AtomicBool,
        search_delay: Mutex<HashMap<String, Duration>>,
    }

    impl MockSource {
        fn with_rows(rows: Vec<Row>) -> Self {
            Self {
                rows,
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn searches(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::Search(q) => Some(q),
                    Call::Page(..) => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl SearchSource for MockSource {
        type Item = Row;

        async fn fetch_page(&self, page: u32, limit: u32) -> Result<Page<Row>, ApiError> {
            self.calls.lock().unwrap().push(Call::Page(page, limit));
            if self.fail_pages.load(Ordering::SeqCst) {
                return Err(ApiError::Network("connection refused".into()));
            }
            let items = slice_page(&self.rows, page, limit).to_vec();
            Ok(Page {
                items,
                pagination: local_pagination(self.rows.len(), page, limit),
            })
        }

        async fn search(&self, query: &str) -> Result<Vec<Row>, ApiError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Search(query.to_string()));
            let delay = self.search_delay.lock().unwrap().get(query).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_search.load(Ordering::SeqCst) {
                return Err(ApiError::Network("connection refused".into()));
            }
            Ok(filter_local(&self.rows, query))
        }

        fn retain(&self, item: &Row) -> bool {
            !self.only_flagged.load(Ordering::SeqCst) || item.flagged
        }
    }

    fn rows(n: u32) -> Vec<Row> {
        (1..=n)
            .map(|i| row(i, &format!("Patient {i}"), &format!("98765{i:05}")))
            .collect()
    }

    fn controller(rows: Vec<Row>) -> (SearchController<MockSource>, MemoryNotifier) {
        let notifier = MemoryNotifier::new();
        let controller = SearchController::new(MockSource::with_rows(rows), Arc::new(notifier.clone()));
        (controller, notifier)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    async fn wait_past_debounce() {
        tokio::time::sleep(config::SEARCH_DEBOUNCE + Duration::from_millis(1)).await;
        settle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn typing_issues_one_search_for_final_query() {
        let (c, _) = controller(rows(30));
        c.load_initial().await.unwrap();

        for partial in ["P", "Pa", "Pat", "Patient 1"] {
            c.set_query(partial);
            assert_eq!(c.query(), partial);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        wait_past_debounce().await;

        assert_eq!(c.source().searches(), vec!["Patient 1".to_string()]);
        assert!(c.is_search_mode());
        // "Patient 1", "Patient 10".."Patient 19"
        assert_eq!(c.pagination().total_items, 11);
    }

    #[tokio::test(start_paused = true)]
    async fn search_results_are_sliced_without_requests() {
        let (c, _) = controller(rows(30));
        c.load_initial().await.unwrap();
        c.set_query("Patient");
        wait_past_debounce().await;
        let calls_before = c.source().calls().len();

        assert_eq!(c.pagination().total_pages, 3);
        c.set_page(3).await.unwrap();
        let third = c.visible_items();
        assert_eq!(third.len(), 10);
        assert_eq!(third[0].id, "P021");
        c.set_page(3).await.unwrap();
        assert_eq!(c.visible_items(), third);

        c.set_items_per_page(20).await.unwrap();
        assert_eq!(c.current_page(), 1);
        c.set_page(2).await.unwrap();
        assert_eq!(c.visible_items().len(), 10);

        assert_eq!(c.source().calls().len(), calls_before);
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_query_returns_to_browse_page_one() {
        let (c, _) = controller(rows(30));
        c.load_initial().await.unwrap();
        c.set_query("Patient");
        wait_past_debounce().await;
        c.set_page(2).await.unwrap();

        c.clear_search().await.unwrap();

        assert!(!c.is_search_mode());
        assert_eq!(c.query(), "");
        assert_eq!(c.current_page(), 1);
        assert_eq!(c.source().calls().last(), Some(&Call::Page(1, 10)));
    }

    #[tokio::test(start_paused = true)]
    async fn emptied_query_at_fire_time_resumes_browse() {
        let (c, _) = controller(rows(30));
        c.load_initial().await.unwrap();
        c.set_query("Patient 2");
        wait_past_debounce().await;
        assert!(c.is_search_mode());

        c.set_query("Patient");
        c.set_query("   ");
        wait_past_debounce().await;

        assert!(!c.is_search_mode());
        assert_eq!(c.current_page(), 1);
        assert_eq!(c.source().searches(), vec!["Patient 2".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn emptying_query_discards_first_search_in_flight() {
        let (c, notifier) = controller(rows(30));
        c.load_initial().await.unwrap();
        c.source()
            .search_delay
            .lock()
            .unwrap()
            .insert("Patient 1".into(), Duration::from_secs(2));

        c.set_query("Patient 1");
        wait_past_debounce().await;
        assert!(c.is_searching());
        c.set_query("");
        wait_past_debounce().await;

        tokio::time::sleep(Duration::from_secs(3)).await;
        settle().await;

        assert_eq!(c.query(), "");
        assert!(!c.is_search_mode());
        assert!(!c.is_searching());
        assert_eq!(c.visible_items(), rows(30)[..10].to_vec());
        assert!(notifier.all().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn page_size_change_in_browse_refetches_page_one() {
        let (c, _) = controller(rows(50));
        c.load_initial().await.unwrap();
        c.set_page(3).await.unwrap();
        assert_eq!(c.current_page(), 3);

        c.set_items_per_page(5).await.unwrap();

        assert_eq!(c.current_page(), 1);
        assert_eq!(c.items_per_page(), 5);
        assert_eq!(c.source().calls().last(), Some(&Call::Page(1, 5)));
        assert_eq!(c.visible_items().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_page_size_change_keeps_previous_page() {
        let (c, _) = controller(rows(50));
        c.load_initial().await.unwrap();
        c.set_page(3).await.unwrap();
        let before = c.visible_items();
        c.source().fail_pages.store(true, Ordering::SeqCst);

        assert!(c.set_items_per_page(20).await.is_err());

        assert_eq!(c.current_page(), 3);
        assert_eq!(c.items_per_page(), 10);
        assert_eq!(c.visible_items(), before);
        assert_eq!(c.pagination().current_page, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_range_pages_are_ignored() {
        let (c, _) = controller(rows(15));
        c.load_initial().await.unwrap();
        let calls = c.source().calls().len();

        c.set_page(0).await.unwrap();
        c.set_page(3).await.unwrap();
        c.prev_page().await.unwrap();

        assert_eq!(c.current_page(), 1);
        assert_eq!(c.source().calls().len(), calls);

        c.next_page().await.unwrap();
        assert_eq!(c.current_page(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_search_falls_back_to_loaded_records() {
        let mut list = rows(5);
        list[2].phone = "9876543210".into();
        let (c, _) = controller(list);
        c.load_initial().await.unwrap();
        c.source().fail_search.store(true, Ordering::SeqCst);

        c.set_query("9876543210");
        wait_past_debounce().await;

        let found = c.visible_items();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "P003");
        assert!(c.is_search_mode());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_results_is_a_state_with_notice() {
        let (c, notifier) = controller(rows(5));
        c.load_initial().await.unwrap();

        c.set_query("nobody");
        wait_past_debounce().await;

        assert!(c.is_search_mode());
        assert!(c.visible_items().is_empty());
        assert_eq!(c.pagination().total_pages, 0);
        assert!(notifier.contains(&Notification::NoSearchResults {
            query: "nobody".into()
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_response_is_discarded() {
        let (c, _) = controller(rows(30));
        c.load_initial().await.unwrap();
        c.source()
            .search_delay
            .lock()
            .unwrap()
            .insert("Patient 1".into(), Duration::from_secs(2));

        c.set_query("Patient 1");
        wait_past_debounce().await;
        // First search is now in flight for two seconds.
        c.set_query("Patient 2");
        wait_past_debounce().await;
        assert_eq!(c.pagination().total_items, 11);

        tokio::time::sleep(Duration::from_secs(3)).await;
        settle().await;

        assert_eq!(
            c.source().searches(),
            vec!["Patient 1".to_string(), "Patient 2".to_string()]
        );
        // "Patient 2", "Patient 20".."Patient 29"
        let names: Vec<String> = c.all_items().into_iter().map(|r| r.name).collect();
        assert!(names.iter().all(|n| n.starts_with("Patient 2")));
    }

    #[tokio::test(start_paused = true)]
    async fn submit_searches_immediately_and_rejects_empty() {
        let (c, notifier) = controller(rows(10));
        c.load_initial().await.unwrap();

        c.set_query("Patient 3");
        c.submit_query().await;
        assert_eq!(c.source().searches(), vec!["Patient 3".to_string()]);
        assert!(!c.has_pending_search());

        wait_past_debounce().await;
        assert_eq!(c.source().searches().len(), 1);

        c.set_query("");
        c.submit_query().await;
        assert!(notifier
            .all()
            .iter()
            .any(|n| n.message() == "Please enter a search term"));
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_pending_search() {
        let (c, _) = controller(rows(10));
        c.set_query("Patient");
        c.teardown();
        wait_past_debounce().await;
        assert!(c.source().searches().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn filter_narrows_before_search() {
        let (c, _) = controller(rows(10));
        c.load_initial().await.unwrap();
        c.source().only_flagged.store(true, Ordering::SeqCst);

        c.set_query("Patient");
        wait_past_debounce().await;

        let found = c.all_items();
        assert_eq!(found.len(), 5);
        assert!(found.iter().all(|r| r.flagged));
    }

    #[tokio::test(start_paused = true)]
    async fn remove_updates_both_lists_without_refetch() {
        let (c, _) = controller(rows(10));
        c.load_initial().await.unwrap();
        c.set_query("Patient");
        wait_past_debounce().await;
        let calls = c.source().calls().len();

        let removed = c.remove_where(|r| r.id == "P004");

        assert_eq!(removed, 1);
        assert!(c.all_items().iter().all(|r| r.id != "P004"));
        assert_eq!(c.pagination().total_items, 9);

        c.clear_search().await.unwrap();
        assert!(c.source().calls().len() > calls);
    }

    #[tokio::test(start_paused = true)]
    async fn remove_in_browse_adjusts_totals() {
        let (c, _) = controller(rows(12));
        c.load_initial().await.unwrap();

        let removed = c.remove_where(|r| r.id == "P001");

        assert_eq!(removed, 1);
        assert_eq!(c.visible_items().len(), 9);
        assert_eq!(c.pagination().total_items, 11);
    }

    #[tokio::test(start_paused = true)]
    async fn page_labels_follow_mode() {
        let (c, _) = controller(rows(200));
        c.load_initial().await.unwrap();
        c.set_page(10).await.unwrap();
        let labels = c.page_labels();
        assert_eq!(labels.first(), Some(&PageLabel::Page(1)));
        assert_eq!(labels.last(), Some(&PageLabel::Page(20)));
        assert!(labels.contains(&PageLabel::Ellipsis));
    }
}
