//! Debounced, cancelable, cached lookup controller.
//!
//! One [`SearchController`] backs one lookup input (a customer picker, a
//! material picker, ...). It turns keystrokes into at most one backend request
//! at a time and publishes what the view should render through a
//! [`watch`] channel, plus discrete [`SearchEvent`]s on a broadcast bus.
//!
//! All mutable state sits in one `ControllerState` behind a mutex that is
//! never held across an `.await`. Replacing the in-flight token and checking
//! whether a finished request is still current both happen under that lock,
//! which is what makes "last issued wins" hold on a multi-threaded runtime.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::events::SearchEvent;
use crate::domain::{PageMode, SearchRequest, cache_key};
use crate::models::{EntityMapper, SearchPage, Suggestion, parse_search_body};
use crate::services::lookup_service::{SearchBackend, SearchError};
use crate::services::search_cache::SearchCache;

/// Tunables for one controller.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub min_query_len: usize,
    pub debounce: Duration,
    pub page_size: u32,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
    /// `None` means a request only ends by completing or being superseded.
    pub request_timeout: Option<Duration>,
    pub event_bus_buffer_size: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            min_query_len: 2,
            debounce: Duration::from_millis(300),
            page_size: 20,
            cache_ttl: Duration::from_secs(300),
            cache_capacity: 50,
            request_timeout: None,
            event_bus_buffer_size: 64,
        }
    }
}

impl From<&Config> for SearchSettings {
    fn from(config: &Config) -> Self {
        Self {
            min_query_len: config.search.min_query_len,
            debounce: Duration::from_millis(config.search.debounce_ms),
            page_size: config.search.page_size,
            cache_ttl: Duration::from_secs(config.search.cache_ttl_seconds),
            cache_capacity: config.search.cache_capacity,
            request_timeout: config.backend.request_timeout(),
            event_bus_buffer_size: config.search.event_bus_buffer_size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SearchStatus {
    #[default]
    Idle,
    Debouncing,
    Searching,
    Resolved,
    Error,
}

/// Why the dropdown has nothing to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoOptionsReason {
    BelowThreshold,
    Loading,
    NoResults,
}

impl NoOptionsReason {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::BelowThreshold => "Keep typing to search",
            Self::Loading => "Searching...",
            Self::NoResults => "No results found",
        }
    }
}

/// What the owning view renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchSnapshot {
    /// Raw input text, updated on every keystroke.
    pub query: String,
    pub options: Vec<Suggestion>,
    pub loading: bool,
    pub has_more: bool,
    /// Last page merged into `options`.
    pub page: u32,
    pub status: SearchStatus,
    pub below_threshold: bool,
}

impl SearchSnapshot {
    #[must_use]
    pub fn no_options_reason(&self) -> Option<NoOptionsReason> {
        if !self.options.is_empty() {
            None
        } else if self.loading {
            Some(NoOptionsReason::Loading)
        } else if self.below_threshold {
            Some(NoOptionsReason::BelowThreshold)
        } else {
            Some(NoOptionsReason::NoResults)
        }
    }
}

/// Result of [`SearchController::search`]. Never an `Err`: failures are
/// already reflected in the published snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Fetched(SearchPage),
    Cached(SearchPage),
    /// Superseded by a newer request or torn down. Nothing was changed.
    Aborted,
    Failed(SearchError),
    /// Below threshold, nothing more to load, or controller torn down.
    Skipped,
}

struct ControllerState {
    query: String,
    /// Trimmed query of the last issued search.
    active_query: String,
    options: Vec<Suggestion>,
    loading: bool,
    has_more: bool,
    page: u32,
    status: SearchStatus,
    cache: SearchCache,
    debounce: Option<JoinHandle<()>>,
    debounce_seq: u64,
    in_flight: Option<CancellationToken>,
    closed: bool,
}

impl ControllerState {
    fn new(settings: &SearchSettings) -> Self {
        Self {
            query: String::new(),
            active_query: String::new(),
            options: Vec::new(),
            loading: false,
            has_more: false,
            page: 0,
            status: SearchStatus::Idle,
            cache: SearchCache::new(settings.cache_ttl, settings.cache_capacity),
            debounce: None,
            debounce_seq: 0,
            in_flight: None,
            closed: false,
        }
    }

    fn cancel_debounce(&mut self) {
        self.debounce_seq = self.debounce_seq.wrapping_add(1);
        if let Some(handle) = self.debounce.take() {
            handle.abort();
        }
    }

    /// Returns whether a live request was cancelled.
    fn cancel_in_flight(&mut self) -> bool {
        self.in_flight.take().is_some_and(|token| {
            token.cancel();
            true
        })
    }

    fn clear_results(&mut self) {
        self.options.clear();
        self.has_more = false;
        self.loading = false;
        self.page = 0;
    }
}

struct Inner<B, M> {
    id: Uuid,
    backend: B,
    mapper: M,
    settings: SearchSettings,
    state: Mutex<ControllerState>,
    snapshot_tx: watch::Sender<SearchSnapshot>,
    events: broadcast::Sender<SearchEvent>,
}

impl<B, M> Inner<B, M>
where
    B: SearchBackend + 'static,
    M: EntityMapper + 'static,
{
    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn below_threshold(&self, trimmed: &str) -> bool {
        trimmed.chars().count() < self.settings.min_query_len
    }

    fn publish(&self, state: &ControllerState) {
        self.snapshot_tx.send_replace(SearchSnapshot {
            query: state.query.clone(),
            options: state.options.clone(),
            loading: state.loading,
            has_more: state.has_more,
            page: state.page,
            status: state.status,
            below_threshold: self.below_threshold(state.query.trim()),
        });
    }

    fn emit(&self, event: SearchEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn count(&self, name: &'static str) {
        metrics::counter!(name, "endpoint" => self.backend.name().to_string()).increment(1);
    }

    async fn fire_debounced(&self, seq: u64, query: String) {
        debug!(controller = %self.id, "Debounce elapsed for '{}'", query);
        self.search(&query, 0, PageMode::Replace, Some(seq)).await;
    }

    /// `debounce_seq` is set when a debounce timer issued the search; it must
    /// still match the controller's sequence when the request is installed.
    async fn search(
        &self,
        query: &str,
        page: u32,
        mode: PageMode,
        debounce_seq: Option<u64>,
    ) -> SearchOutcome {
        let query = query.trim().to_string();
        if self.below_threshold(&query) {
            let reason = SearchError::BelowThreshold {
                min: self.settings.min_query_len,
            };
            debug!(controller = %self.id, "Refusing search for '{}': {}", query, reason);
            return SearchOutcome::Skipped;
        }

        let key = cache_key(&query, page);
        let token = CancellationToken::new();

        {
            let mut state = self.lock();
            if state.closed {
                return SearchOutcome::Skipped;
            }

            if let Some(seq) = debounce_seq {
                if state.debounce_seq != seq {
                    debug!(controller = %self.id, "Debounced search for '{}' superseded", query);
                    return SearchOutcome::Aborted;
                }
                // Fired: later keystrokes supersede this search through its
                // token instead of aborting the task mid-request.
                state.debounce = None;
            }

            // Append requests always go to the network.
            if !mode.is_append()
                && let Some(cached) = state.cache.get(&key)
            {
                // Anything still in flight is for an older query.
                if state.cancel_in_flight() {
                    self.count("lookup_aborted_total");
                }
                state.active_query.clone_from(&query);
                state.options.clone_from(&cached.results);
                state.has_more = cached.has_more;
                state.page = page;
                state.loading = false;
                state.status = SearchStatus::Resolved;
                self.publish(&state);
                drop(state);

                debug!(controller = %self.id, "Cache hit for {}", key);
                self.count("lookup_cache_hits_total");
                self.emit(SearchEvent::ResultsPublished {
                    query,
                    page,
                    count: cached.len(),
                    has_more: cached.has_more,
                    from_cache: true,
                });
                return SearchOutcome::Cached(cached);
            }

            if let Some(previous) = state.in_flight.replace(token.clone()) {
                previous.cancel();
                self.count("lookup_aborted_total");
                debug!(controller = %self.id, "Superseded in-flight request");
            }
            state.active_query.clone_from(&query);
            state.loading = true;
            state.status = SearchStatus::Searching;
            self.publish(&state);
        }

        self.emit(SearchEvent::SearchStarted {
            query: query.clone(),
            page,
        });
        self.count("lookup_requests_total");

        let request = SearchRequest::new(query.clone(), page, self.settings.page_size);
        let result = self.fetch(&request, &token).await;

        let mut state = self.lock();
        if token.is_cancelled() || state.closed {
            debug!(controller = %self.id, "Discarding response for aborted request '{}'", query);
            return SearchOutcome::Aborted;
        }

        // This request is still the current one; release the slot. A timeout
        // also cancels the token so nothing else treats it as live.
        token.cancel();
        state.in_flight = None;

        match result {
            Ok(body) => {
                let fetched = parse_search_body(&body, &self.mapper);
                state.cache.insert(key, fetched.clone());

                if mode.is_append() {
                    state.options.extend(fetched.results.iter().cloned());
                } else {
                    state.options.clone_from(&fetched.results);
                }
                state.has_more = fetched.has_more;
                state.page = page;
                state.loading = false;
                state.status = SearchStatus::Resolved;
                self.publish(&state);
                drop(state);

                self.emit(SearchEvent::ResultsPublished {
                    query,
                    page,
                    count: fetched.len(),
                    has_more: fetched.has_more,
                    from_cache: false,
                });
                SearchOutcome::Fetched(fetched)
            }
            // Still current here, so a backend-reported abort is a failure
            // like any other.
            Err(err) => {
                state.clear_results();
                state.status = SearchStatus::Error;
                self.publish(&state);
                drop(state);

                warn!(controller = %self.id, "Search for '{}' failed: {}", query, err);
                self.count("lookup_failures_total");
                self.emit(SearchEvent::SearchFailed {
                    query,
                    message: err.to_string(),
                });
                SearchOutcome::Failed(err)
            }
        }
    }

    async fn fetch(
        &self,
        request: &SearchRequest,
        token: &CancellationToken,
    ) -> Result<Value, SearchError> {
        let call = self.backend.fetch(request);

        match self.settings.request_timeout {
            Some(limit) => tokio::select! {
                biased;
                () = token.cancelled() => Err(SearchError::Aborted),
                res = tokio::time::timeout(limit, call) => {
                    res.unwrap_or(Err(SearchError::TimedOut(limit)))
                }
            },
            None => tokio::select! {
                biased;
                () = token.cancelled() => Err(SearchError::Aborted),
                res = call => res,
            },
        }
    }
}

/// Lookup controller for one input.
///
/// Must be driven from inside a tokio runtime: [`Self::on_query_changed`]
/// spawns the debounce timer. Dropping the controller tears it down.
pub struct SearchController<B, M>
where
    B: SearchBackend + 'static,
    M: EntityMapper + 'static,
{
    inner: Arc<Inner<B, M>>,
}

impl<B, M> SearchController<B, M>
where
    B: SearchBackend + 'static,
    M: EntityMapper + 'static,
{
    #[must_use]
    pub fn new(backend: B, mapper: M, settings: SearchSettings) -> Self {
        let state = ControllerState::new(&settings);
        let (snapshot_tx, _) = watch::channel(SearchSnapshot {
            below_threshold: true,
            ..SearchSnapshot::default()
        });
        let (events, _) = broadcast::channel(settings.event_bus_buffer_size.max(1));

        let id = Uuid::new_v4();
        info!(controller = %id, "Search controller created for '{}'", backend.name());

        Self {
            inner: Arc::new(Inner {
                id,
                backend,
                mapper,
                settings,
                state: Mutex::new(state),
                snapshot_tx,
                events,
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    #[must_use]
    pub fn settings(&self) -> &SearchSettings {
        &self.inner.settings
    }

    /// Handles one input event.
    ///
    /// The published query updates immediately. Below the threshold the list
    /// is cleared and any pending or in-flight work is cancelled; otherwise a
    /// search is (re)scheduled for when typing pauses.
    pub fn on_query_changed(&self, raw: &str) {
        let inner = &self.inner;
        let trimmed = raw.trim().to_string();

        let mut state = inner.lock();
        if state.closed {
            return;
        }

        state.query = raw.to_string();
        inner.emit(SearchEvent::QueryChanged {
            query: raw.to_string(),
        });

        if inner.below_threshold(&trimmed) {
            state.cancel_debounce();
            if state.cancel_in_flight() {
                inner.count("lookup_aborted_total");
            }
            state.clear_results();
            state.active_query.clear();
            state.status = SearchStatus::Idle;
            inner.publish(&state);
            drop(state);

            debug!(controller = %inner.id, "Query below threshold, cleared suggestions");
            inner.emit(SearchEvent::Cleared);
            return;
        }

        state.cancel_debounce();
        let seq = state.debounce_seq;
        let delay = inner.settings.debounce;
        let task_inner = Arc::clone(inner);

        state.debounce = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task_inner.fire_debounced(seq, trimmed).await;
        }));
        state.status = SearchStatus::Debouncing;
        inner.publish(&state);
    }

    /// Applies a pick from the dropdown, or clears it with `None`.
    ///
    /// Cancels pending and in-flight searches so a late response cannot
    /// reopen the list, then notifies subscribers.
    pub fn on_select(&self, selection: Option<Suggestion>) {
        let inner = &self.inner;
        let mut state = inner.lock();
        if state.closed {
            return;
        }

        state.cancel_debounce();
        if state.cancel_in_flight() {
            inner.count("lookup_aborted_total");
        }
        state.query = selection
            .as_ref()
            .map(|s| s.label.clone())
            .unwrap_or_default();
        state.active_query.clear();
        state.clear_results();
        state.status = SearchStatus::Idle;
        inner.publish(&state);
        drop(state);

        inner.emit(SearchEvent::Selected(selection));
    }

    /// Runs one search immediately, bypassing the debounce.
    pub async fn search(&self, query: &str, page: u32, append: bool) -> SearchOutcome {
        self.inner
            .search(query, page, PageMode::from(append), None)
            .await
    }

    /// Fetches the next page of the current query and appends it.
    pub async fn load_more(&self) -> SearchOutcome {
        let (query, next_page) = {
            let state = self.inner.lock();
            if state.closed || state.loading || !state.has_more || state.active_query.is_empty()
            {
                return SearchOutcome::Skipped;
            }
            (state.active_query.clone(), state.page + 1)
        };

        self.inner
            .search(&query, next_page, PageMode::Append, None)
            .await
    }

    /// Clears the debounce timer, aborts the in-flight request and turns
    /// every later call into a no-op. Idempotent.
    pub fn teardown(&self) {
        let inner = &self.inner;
        let mut state = inner.lock();
        if state.closed {
            return;
        }

        state.closed = true;
        state.cancel_debounce();
        state.cancel_in_flight();
        state.cache.clear();
        state.loading = false;
        state.status = SearchStatus::Idle;
        inner.publish(&state);
        drop(state);

        info!(controller = %inner.id, "Search controller torn down");
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    #[must_use]
    pub fn snapshot(&self) -> SearchSnapshot {
        self.inner.snapshot_tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SearchSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<SearchEvent> {
        self.inner.events.subscribe()
    }

    #[must_use]
    pub fn is_cached(&self, query: &str, page: u32) -> bool {
        self.inner.lock().cache.contains(&cache_key(query.trim(), page))
    }

    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.inner.lock().cache.len()
    }
}

impl<B, M> Drop for SearchController<B, M>
where
    B: SearchBackend + 'static,
    M: EntityMapper + 'static,
{
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;
    use crate::domain::EntityId;
    use crate::models::FieldMapper;
    use serde_json::json;

    struct EchoBackend;

    #[async_trait::async_trait]
    impl SearchBackend for EchoBackend {
        fn name(&self) -> &str {
            "echo"
        }

        async fn fetch(&self, request: &SearchRequest) -> Result<Value, SearchError> {
            Ok(json!({
                "success": true,
                "customers": [{"id": request.page, "customerName": request.query}],
                "hasMore": request.page < 2
            }))
        }
    }

    fn controller() -> SearchController<EchoBackend, FieldMapper> {
        SearchController::new(
            EchoBackend,
            FieldMapper::from(&EndpointConfig::customers()),
            SearchSettings::default(),
        )
    }

    fn suggestion(label: &str) -> Suggestion {
        Suggestion {
            id: EntityId::from(9),
            label: label.to_string(),
            secondary: None,
            contact: None,
            raw: json!({}),
        }
    }

    #[test]
    fn test_no_options_reasons_are_distinct() {
        let mut snapshot = SearchSnapshot {
            below_threshold: true,
            ..SearchSnapshot::default()
        };
        assert_eq!(
            snapshot.no_options_reason(),
            Some(NoOptionsReason::BelowThreshold)
        );

        snapshot.below_threshold = false;
        snapshot.loading = true;
        assert_eq!(snapshot.no_options_reason(), Some(NoOptionsReason::Loading));

        snapshot.loading = false;
        assert_eq!(snapshot.no_options_reason(), Some(NoOptionsReason::NoResults));

        snapshot.options.push(suggestion("x"));
        assert_eq!(snapshot.no_options_reason(), None);
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.search.debounce_ms = 450;
        config.backend.request_timeout_ms = 2000;

        let settings = SearchSettings::from(&config);
        assert_eq!(settings.debounce, Duration::from_millis(450));
        assert_eq!(settings.request_timeout, Some(Duration::from_secs(2)));
        assert_eq!(settings.cache_capacity, 50);
    }

    #[tokio::test]
    async fn test_search_below_threshold_is_skipped() {
        let ctrl = controller();
        assert_eq!(ctrl.search(" a ", 0, false).await, SearchOutcome::Skipped);
        assert_eq!(ctrl.cache_len(), 0);
    }

    #[tokio::test]
    async fn test_load_more_appends_next_page() {
        let ctrl = controller();
        let first = ctrl.search("acme", 0, false).await;
        assert!(matches!(first, SearchOutcome::Fetched(_)));
        assert!(ctrl.snapshot().has_more);

        let second = ctrl.load_more().await;
        assert!(matches!(second, SearchOutcome::Fetched(_)));

        let snapshot = ctrl.snapshot();
        assert_eq!(snapshot.options.len(), 2);
        assert_eq!(snapshot.page, 1);
        assert_eq!(snapshot.options[1].id, EntityId::from(1));
    }

    #[tokio::test]
    async fn test_load_more_without_more_is_skipped() {
        let ctrl = controller();
        assert_eq!(ctrl.load_more().await, SearchOutcome::Skipped);

        ctrl.search("acme", 2, false).await;
        assert!(!ctrl.snapshot().has_more);
        assert_eq!(ctrl.load_more().await, SearchOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_select_replaces_query_and_notifies() {
        let ctrl = controller();
        let mut events = ctrl.events();
        ctrl.search("acme", 0, false).await;

        ctrl.on_select(Some(suggestion("Acme Co")));

        let snapshot = ctrl.snapshot();
        assert_eq!(snapshot.query, "Acme Co");
        assert!(snapshot.options.is_empty());
        assert_eq!(snapshot.status, SearchStatus::Idle);

        let mut selected = None;
        while let Ok(event) = events.try_recv() {
            if let SearchEvent::Selected(s) = event {
                selected = s;
            }
        }
        assert_eq!(selected.map(|s| s.label), Some("Acme Co".to_string()));

        ctrl.on_select(None);
        assert_eq!(ctrl.snapshot().query, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounced_search_rechecks_sequence_before_starting() {
        let ctrl = controller();
        ctrl.on_query_changed("acme");
        let stale = ctrl.inner.lock().debounce_seq;

        // Keystroke lands after the timer fired but before the request starts.
        ctrl.on_query_changed("a");
        let outcome = ctrl
            .inner
            .search("acme", 0, PageMode::Replace, Some(stale))
            .await;
        assert_eq!(outcome, SearchOutcome::Aborted);

        let snapshot = ctrl.snapshot();
        assert_eq!(snapshot.query, "a");
        assert!(snapshot.options.is_empty());
        assert!(!snapshot.loading);
        assert_eq!(snapshot.status, SearchStatus::Idle);
        assert!(ctrl.inner.lock().in_flight.is_none());
        assert_eq!(ctrl.cache_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fired_debounce_releases_its_handle() {
        let ctrl = controller();
        ctrl.on_query_changed("acme");
        let seq = ctrl.inner.lock().debounce_seq;

        let outcome = ctrl
            .inner
            .search("acme", 0, PageMode::Replace, Some(seq))
            .await;
        assert!(matches!(outcome, SearchOutcome::Fetched(_)));
        assert!(ctrl.inner.lock().debounce.is_none());
    }

    #[tokio::test]
    async fn test_teardown_makes_operations_noop() {
        let ctrl = controller();
        ctrl.search("acme", 0, false).await;
        ctrl.teardown();
        ctrl.teardown();

        assert!(ctrl.is_closed());
        assert_eq!(ctrl.cache_len(), 0);
        assert_eq!(ctrl.search("acme", 0, false).await, SearchOutcome::Skipped);

        ctrl.on_query_changed("acme corp");
        assert_ne!(ctrl.snapshot().query, "acme corp");
    }
}
