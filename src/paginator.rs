//! Incremental fetch-and-merge over a paged source.
//!
//! A [`Paginator`] owns the query, page cursor and accumulated items for one
//! screen. Every mutation is published through a `watch` channel so the UI
//! always renders the latest snapshot. At most one fetch runs at a time: a
//! trigger that arrives while a fetch is in flight is dropped.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::PagedResult;

/// Where a [`Paginator`] pulls its pages from.
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Clone + Send + Sync + 'static;

    /// Items in a full page. A shorter page marks the end of the data.
    fn page_size(&self) -> usize;

    async fn fetch_page(&self, query: &str, page: u32) -> Result<PagedResult<Self::Item>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// Discards prior results and starts over at page 1
    Reset,
    /// Appends the next page to the loaded items
    Incremental,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageState<T> {
    pub query: String,
    pub page: u32,
    pub items: Vec<T>,
    pub loading: Option<FetchKind>,
    pub error: Option<String>,
    pub end_reached: bool,
    pub total_count: Option<u64>,
    // Bumped by every reset fetch and by clear(); responses from an older
    // session are dropped.
    session: u64,
    // Query the loaded items belong to. Incremental fetches use this, not the
    // text currently being edited.
    session_query: Option<String>,
}

impl<T> Default for PageState<T> {
    fn default() -> Self {
        Self {
            query: String::new(),
            page: 1,
            items: Vec::new(),
            loading: None,
            error: None,
            end_reached: false,
            total_count: None,
            session: 0,
            session_query: None,
        }
    }
}

impl<T> PageState<T> {
    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    pub fn is_loading_more(&self) -> bool {
        self.loading == Some(FetchKind::Incremental)
    }

    /// Whether a scroll or "show more" trigger should issue a fetch.
    pub fn can_load_more(&self) -> bool {
        !self.is_loading() && !self.end_reached && !self.items.is_empty()
    }

    pub fn submitted_query(&self) -> Option<&str> {
        self.session_query.as_deref()
    }

    fn reset_results(&mut self) {
        self.items.clear();
        self.error = None;
        self.end_reached = false;
        self.page = 1;
        self.loading = None;
        self.total_count = None;
    }
}

struct Ticket {
    kind: FetchKind,
    query: String,
    page: u32,
    session: u64,
}

pub struct Paginator<S: PageSource> {
    source: S,
    state: watch::Sender<PageState<S::Item>>,
    load_more_delay: Duration,
}

impl<S: PageSource> Paginator<S> {
    pub fn new(source: S) -> Self {
        let (state, _) = watch::channel(PageState::default());
        Self {
            source,
            state,
            load_more_delay: Duration::ZERO,
        }
    }

    /// Pause before each incremental fetch to go easy on the upstream rate limit.
    pub fn with_load_more_delay(mut self, delay: Duration) -> Self {
        self.load_more_delay = delay;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<PageState<S::Item>> {
        self.state.subscribe()
    }

    /// Borrow the current state. Do not hold across an `.await`.
    pub fn state(&self) -> watch::Ref<'_, PageState<S::Item>> {
        self.state.borrow()
    }

    pub fn snapshot(&self) -> PageState<S::Item> {
        self.state.borrow().clone()
    }

    pub fn set_query(&self, text: &str) {
        let query = text.trim();
        self.state.send_if_modified(|state| {
            if state.query == query {
                return false;
            }
            state.query = query.to_string();
            true
        });
    }

    /// Fetch page 1 (`reset`) or the page after the current one.
    pub async fn search(&self, reset: bool) {
        let Some(ticket) = self.begin(reset) else {
            return;
        };

        if ticket.kind == FetchKind::Incremental && !self.load_more_delay.is_zero() {
            tokio::time::sleep(self.load_more_delay).await;
        }

        debug!(query = %ticket.query, page = ticket.page, kind = ?ticket.kind, "fetching page");
        let result = self.source.fetch_page(&ticket.query, ticket.page).await;
        self.finish(ticket, result);
    }

    /// Incremental fetch, skipped once the end is reached or nothing is loaded yet.
    pub async fn load_more(&self) {
        let ready = self.state.borrow().can_load_more();
        if ready {
            self.search(false).await;
        }
    }

    pub fn clear(&self) {
        self.state.send_modify(|state| {
            *state = PageState {
                session: state.session + 1,
                ..PageState::default()
            };
        });
    }

    fn begin(&self, reset: bool) -> Option<Ticket> {
        let mut ticket = None;
        self.state.send_if_modified(|state| {
            if state.is_loading() {
                debug!("fetch already in flight, ignoring trigger");
                return false;
            }

            if state.query.is_empty() {
                state.reset_results();
                state.session_query = None;
                return true;
            }

            let kind = if reset {
                FetchKind::Reset
            } else {
                FetchKind::Incremental
            };

            let page = match kind {
                FetchKind::Reset => {
                    state.session += 1;
                    state.session_query = Some(state.query.clone());
                    1
                }
                FetchKind::Incremental => {
                    if state.session_query.is_none() {
                        state.session_query = Some(state.query.clone());
                    }
                    state.page + 1
                }
            };

            state.loading = Some(kind);
            state.error = None;
            ticket = Some(Ticket {
                kind,
                query: state.session_query.clone().unwrap_or_default(),
                page,
                session: state.session,
            });
            true
        });
        ticket
    }

    fn finish(&self, ticket: Ticket, result: Result<PagedResult<S::Item>>) {
        let page_size = self.source.page_size();
        self.state.send_if_modified(|state| {
            if state.session != ticket.session {
                debug!(query = %ticket.query, page = ticket.page, "discarding stale page");
                return false;
            }

            state.loading = None;
            match result {
                Ok(page) => {
                    state.end_reached = page.items.len() < page_size;
                    match ticket.kind {
                        FetchKind::Reset => {
                            state.items = page.items;
                            state.total_count = page.total_count;
                        }
                        FetchKind::Incremental => {
                            state.items.extend(page.items);
                            if page.total_count.is_some() {
                                state.total_count = page.total_count;
                            }
                        }
                    }
                    state.page = ticket.page;
                }
                Err(err) => {
                    warn!(query = %ticket.query, page = ticket.page, error = %err, "page fetch failed");
                    if ticket.kind == FetchKind::Reset {
                        state.items.clear();
                        state.page = 1;
                        state.end_reached = false;
                        state.total_count = None;
                    }
                    state.error = Some(err.to_string());
                }
            }
            true
        });
    }
}

/// True when `selected` is within `threshold` rows of the last loaded item.
pub fn near_end(selected: usize, len: usize, threshold: usize) -> bool {
    len > 0 && selected + threshold >= len
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use tokio::sync::Semaphore;

    use super::*;
    use crate::error::OctoseekError;

    /// Replays canned pages in order; an exhausted script yields empty pages.
    struct Scripted {
        page_size: usize,
        responses: Mutex<VecDeque<Result<Vec<u32>>>>,
        calls: Mutex<Vec<(String, u32)>>,
        gate: Option<Arc<Semaphore>>,
    }

    impl Scripted {
        fn new(page_size: usize, responses: Vec<Result<Vec<u32>>>) -> Self {
            Self {
                page_size,
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
                gate: None,
            }
        }

        fn gated(mut self, gate: Arc<Semaphore>) -> Self {
            self.gate = Some(gate);
            self
        }
    }

    #[async_trait]
    impl PageSource for Scripted {
        type Item = u32;

        fn page_size(&self) -> usize {
            self.page_size
        }

        async fn fetch_page(&self, query: &str, page: u32) -> Result<PagedResult<u32>> {
            self.calls.lock().unwrap().push((query.to_string(), page));
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            let next = self.responses.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(vec![])).map(PagedResult::new)
        }
    }

    fn range(from: u32, n: u32) -> Vec<u32> {
        (from..from + n).collect()
    }

    fn calls(p: &Paginator<Scripted>) -> Vec<(String, u32)> {
        p.source.calls.lock().unwrap().clone()
    }

    fn fail() -> Result<Vec<u32>> {
        Err(OctoseekError::Api("rate limited".into()))
    }

    #[tokio::test]
    async fn empty_query_clears_without_fetching() {
        let p = Paginator::new(Scripted::new(30, vec![Ok(range(0, 30))]));
        p.set_query("octocat");
        p.search(true).await;
        assert_eq!(p.snapshot().items.len(), 30);

        p.set_query("   ");
        p.search(false).await;

        let s = p.snapshot();
        assert!(s.items.is_empty());
        assert_eq!(s.page, 1);
        assert!(!s.end_reached);
        assert!(s.error.is_none());
        assert!(!s.is_loading());
        assert_eq!(calls(&p).len(), 1);
    }

    #[tokio::test]
    async fn whitespace_query_never_calls_source() {
        let p = Paginator::new(Scripted::new(30, vec![]));
        p.set_query(" \t ");
        p.search(true).await;
        p.search(false).await;
        assert!(calls(&p).is_empty());
        assert_eq!(p.snapshot().query, "");
    }

    #[tokio::test]
    async fn set_query_trims() {
        let p = Paginator::new(Scripted::new(30, vec![]));
        p.set_query("  octocat ");
        assert_eq!(p.snapshot().query, "octocat");
        assert!(!p.snapshot().is_loading());
        assert!(calls(&p).is_empty());
    }

    #[tokio::test]
    async fn octocat_scenario() {
        let p = Paginator::new(Scripted::new(30, vec![Ok(range(0, 30)), Ok(range(30, 12))]));
        p.set_query("octocat");

        p.search(true).await;
        let s = p.snapshot();
        assert_eq!(s.items.len(), 30);
        assert_eq!(s.page, 1);
        assert!(!s.end_reached);

        p.search(false).await;
        let s = p.snapshot();
        assert_eq!(s.items, range(0, 42));
        assert_eq!(s.page, 2);
        assert!(s.end_reached);

        assert_eq!(
            calls(&p),
            vec![("octocat".to_string(), 1), ("octocat".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn reset_replaces_items() {
        let p = Paginator::new(Scripted::new(
            3,
            vec![Ok(vec![1, 2, 3]), Ok(vec![4, 5, 6]), Ok(vec![7])],
        ));
        p.set_query("a");
        p.search(true).await;
        p.search(false).await;
        assert_eq!(p.snapshot().page, 2);

        p.search(true).await;
        let s = p.snapshot();
        assert_eq!(s.items, vec![7]);
        assert_eq!(s.page, 1);
        assert!(s.end_reached);
    }

    #[tokio::test]
    async fn end_reached_flips_back_on_new_reset() {
        let p = Paginator::new(Scripted::new(2, vec![Ok(vec![1]), Ok(vec![1, 2])]));
        p.set_query("a");
        p.search(true).await;
        assert!(p.snapshot().end_reached);

        p.search(true).await;
        assert!(!p.snapshot().end_reached);
    }

    #[tokio::test]
    async fn failed_load_more_keeps_items() {
        let p = Paginator::new(Scripted::new(2, vec![Ok(vec![1, 2]), fail()]));
        p.set_query("a");
        p.search(true).await;
        p.search(false).await;

        let s = p.snapshot();
        assert_eq!(s.items, vec![1, 2]);
        assert_eq!(s.page, 1);
        assert_eq!(s.error.as_deref(), Some("API error: rate limited"));
        assert!(!s.is_loading());
    }

    #[tokio::test]
    async fn failed_reset_empties_items() {
        let p = Paginator::new(Scripted::new(2, vec![Ok(vec![1, 2]), fail()]));
        p.set_query("a");
        p.search(true).await;
        p.set_query("b");
        p.search(true).await;

        let s = p.snapshot();
        assert!(s.items.is_empty());
        assert_eq!(s.page, 1);
        assert!(s.error.is_some());
    }

    #[tokio::test]
    async fn error_cleared_by_next_fetch() {
        let p = Paginator::new(Scripted::new(2, vec![fail(), Ok(vec![1])]));
        p.set_query("a");
        p.search(true).await;
        assert!(p.snapshot().error.is_some());

        p.search(true).await;
        let s = p.snapshot();
        assert!(s.error.is_none());
        assert_eq!(s.items, vec![1]);
    }

    #[tokio::test]
    async fn trigger_while_loading_is_dropped() {
        let gate = Arc::new(Semaphore::new(0));
        let p = Arc::new(Paginator::new(
            Scripted::new(2, vec![Ok(vec![1, 2])]).gated(gate.clone()),
        ));
        p.set_query("a");

        let mut rx = p.subscribe();
        let task = {
            let p = Arc::clone(&p);
            tokio::spawn(async move { p.search(true).await })
        };
        rx.wait_for(|s| s.is_loading()).await.unwrap();

        let before = p.snapshot();
        p.search(true).await;
        p.search(false).await;
        assert_eq!(p.snapshot(), before);
        assert_eq!(calls(&p).len(), 1);

        gate.add_permits(1);
        task.await.unwrap();
        assert_eq!(p.snapshot().items, vec![1, 2]);
    }

    #[tokio::test]
    async fn loading_kind_reported() {
        let gate = Arc::new(Semaphore::new(0));
        let p = Arc::new(Paginator::new(
            Scripted::new(2, vec![Ok(vec![1, 2]), Ok(vec![3])]).gated(gate.clone()),
        ));
        p.set_query("a");
        gate.add_permits(1);
        p.search(true).await;

        let mut rx = p.subscribe();
        let task = {
            let p = Arc::clone(&p);
            tokio::spawn(async move { p.search(false).await })
        };
        rx.wait_for(|s| s.is_loading()).await.unwrap();
        assert!(p.snapshot().is_loading_more());

        gate.add_permits(1);
        task.await.unwrap();
        assert!(!p.snapshot().is_loading());
    }

    #[tokio::test]
    async fn clear_resets_everything() {
        let p = Paginator::new(Scripted::new(2, vec![Ok(vec![1, 2]), fail()]));
        p.set_query("octocat");
        p.search(true).await;
        p.search(false).await;

        p.clear();
        let s = p.snapshot();
        assert_eq!(s.query, "");
        assert!(s.items.is_empty());
        assert_eq!(s.page, 1);
        assert!(!s.end_reached);
        assert!(s.error.is_none());
        assert!(!s.is_loading());
        assert!(s.submitted_query().is_none());
    }

    #[tokio::test]
    async fn response_after_clear_is_discarded() {
        let gate = Arc::new(Semaphore::new(0));
        let p = Arc::new(Paginator::new(
            Scripted::new(2, vec![Ok(vec![1, 2])]).gated(gate.clone()),
        ));
        p.set_query("a");

        let mut rx = p.subscribe();
        let task = {
            let p = Arc::clone(&p);
            tokio::spawn(async move { p.search(true).await })
        };
        rx.wait_for(|s| s.is_loading()).await.unwrap();

        p.clear();
        gate.add_permits(1);
        task.await.unwrap();

        let s = p.snapshot();
        assert!(s.items.is_empty());
        assert!(!s.is_loading());
    }

    #[tokio::test]
    async fn load_more_uses_submitted_query() {
        let p = Paginator::new(Scripted::new(2, vec![Ok(vec![1, 2]), Ok(vec![3, 4])]));
        p.set_query("first");
        p.search(true).await;

        p.set_query("second");
        p.search(false).await;

        assert_eq!(calls(&p)[1], ("first".to_string(), 2));
        assert_eq!(p.snapshot().items, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn load_more_stops_at_end() {
        let p = Paginator::new(Scripted::new(2, vec![Ok(vec![1])]));
        p.set_query("a");
        p.load_more().await;
        assert!(calls(&p).is_empty());

        p.search(true).await;
        p.load_more().await;
        assert_eq!(calls(&p).len(), 1);
    }

    #[tokio::test]
    async fn subscribers_see_updates() {
        let p = Paginator::new(Scripted::new(2, vec![Ok(vec![1, 2])]));
        let mut rx = p.subscribe();
        p.set_query("a");
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        p.search(true).await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().items, vec![1, 2]);
    }

    #[test]
    fn near_end_threshold() {
        assert!(!near_end(0, 0, 3));
        assert!(!near_end(26, 30, 3));
        assert!(near_end(27, 30, 3));
        assert!(near_end(29, 30, 3));
        assert!(near_end(0, 2, 3));
    }
}
