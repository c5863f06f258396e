//! Generic record list controller
//!
//! One implementation drives both streams. The per-stream differences live in
//! [`StreamConfig`], selected through the [`RecordKind`] type parameter.
//!
//! Loading is split in two so the terminal front-end can run the network call
//! on a background task:
//!
//! ```text
//! begin_load() -> PendingFetch --execute()--> FetchOutcome -> finish_load()
//! ```
//!
//! `is_loading` is the only lock. A load requested while it is set is dropped,
//! not queued; [`RecordListController::finish_load`] notices when the state
//! moved on during the fetch and hands back a follow-up fetch instead.

use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::client::{Backend, ConnectionHandle};
use crate::config::ViewerConfig;
use crate::error::Result;
use crate::models::{AutoRefresh, QueryRequest, RecordPage, Stats, StreamKind, TimeBucket, TimeRange};
use crate::timer::{Debouncer, IntervalTimer};

use super::render::{stat_counters, total_pages, ChartView, PaginationView, RecordView, StatCounter};
use super::stream::{QueryIdLink, RecordKind, StreamConfig};

static QUERY_ID_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
            .expect("static regex"),
        Regex::new(r"(?i)^[0-9a-f]{32}$").expect("static regex"),
        Regex::new(r"^[0-9]{6,}$").expect("static regex"),
    ]
});

/// Whether a search term should be treated as a query id rather than free text
pub fn looks_like_query_id(text: &str) -> bool {
    let text = text.trim();
    QUERY_ID_PATTERNS.iter().any(|re| re.is_match(text))
}

/// Filter, paging and scheduling state of one list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerState {
    pub current_page: u32,
    pub page_size: u32,
    pub total_records: u64,
    pub search_query: String,
    pub query_id_search: String,
    pub selected_level: String,
    pub time_range: TimeRange,
    pub auto_refresh: AutoRefresh,
    pub is_loading: bool,
}

/// A fetch that has been started but not yet sent
pub struct PendingFetch<R> {
    seq: u64,
    request: QueryRequest,
    endpoint: &'static str,
    data_key: &'static str,
    backend: Arc<dyn Backend>,
    _record: PhantomData<fn() -> R>,
}

impl<R> std::fmt::Debug for PendingFetch<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingFetch")
            .field("seq", &self.seq)
            .field("endpoint", &self.endpoint)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

impl<R: serde::de::DeserializeOwned> PendingFetch<R> {
    pub fn request(&self) -> &QueryRequest {
        &self.request
    }

    /// Send the request and normalize the response
    pub async fn execute(self) -> FetchOutcome<R> {
        let result = match self.backend.post_records(self.endpoint, &self.request).await {
            Ok(body) => RecordPage::from_response(body, self.data_key),
            Err(e) => Err(e),
        };
        FetchOutcome {
            seq: self.seq,
            request: self.request,
            result,
        }
    }
}

/// Result of a [`PendingFetch`], to be handed back to the controller
#[derive(Debug)]
pub struct FetchOutcome<R> {
    seq: u64,
    request: QueryRequest,
    result: Result<RecordPage<R>>,
}

impl<R> FetchOutcome<R> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// One row of the rendered list
#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub record: RecordView,
    pub expanded: bool,
    pub selected: bool,
}

/// Everything the front-end needs to draw one list
#[derive(Debug, Clone, PartialEq)]
pub struct ListView {
    pub kind: StreamKind,
    pub rows: Vec<RowView>,
    pub pagination: PaginationView,
    pub stats: Vec<StatCounter>,
    pub chart: ChartView,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// The operations both record lists expose
#[async_trait]
pub trait RecordList: Send {
    /// Fetch the current page for the current filters
    async fn load_data(&mut self);

    fn render(&self) -> ListView;

    /// Response member holding the records
    fn data_key(&self) -> &'static str;

    /// Request member carrying the level/status filter
    fn filter_key(&self) -> &'static str;
}

/// Starting point for a list that is loaded once, without user interaction
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub page: u32,
    pub level: Option<String>,
    pub time_range: Option<TimeRange>,
    pub search: Option<String>,
    pub filters: Vec<String>,
}

/// State and fetch orchestration for one record stream
pub struct RecordListController<K: RecordKind> {
    backend: Arc<dyn Backend>,
    connection: ConnectionHandle,
    state: ControllerState,
    records: Vec<K::Record>,
    stats: Stats,
    time_distribution: Option<Vec<TimeBucket>>,
    structured_filters: Vec<String>,
    last_error: Option<String>,
    search_input: String,
    applied_search: String,
    search_debounce: Debouncer,
    debounce_delay: Duration,
    refresh_timer: IntervalTimer,
    active: bool,
    expanded: BTreeSet<usize>,
    selected: usize,
    seq: u64,
}

impl<K: RecordKind> std::fmt::Debug for RecordListController<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordListController")
            .field("kind", &K::CONFIG.kind)
            .field("state", &self.state)
            .field("records", &self.records.len())
            .field("filters", &self.structured_filters)
            .finish_non_exhaustive()
    }
}

impl<K: RecordKind> RecordListController<K> {
    pub fn new(backend: Arc<dyn Backend>, connection: ConnectionHandle, config: &ViewerConfig) -> Self {
        Self {
            backend,
            connection,
            state: ControllerState {
                current_page: 1,
                page_size: config.page_size.max(1),
                total_records: 0,
                search_query: String::new(),
                query_id_search: String::new(),
                selected_level: K::CONFIG.all_levels().to_string(),
                time_range: config.default_time_range,
                auto_refresh: AutoRefresh::Off,
                is_loading: false,
            },
            records: Vec::new(),
            stats: Stats::default(),
            time_distribution: None,
            structured_filters: Vec::new(),
            last_error: None,
            search_input: String::new(),
            applied_search: String::new(),
            search_debounce: Debouncer::new(),
            debounce_delay: config.search_debounce,
            refresh_timer: IntervalTimer::new(),
            active: false,
            expanded: BTreeSet::new(),
            selected: 0,
            seq: 0,
        }
    }

    pub fn config(&self) -> &'static StreamConfig {
        &K::CONFIG
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut ControllerState {
        &mut self.state
    }

    pub fn records(&self) -> &[K::Record] {
        &self.records
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn time_distribution(&self) -> Option<&[TimeBucket]> {
        self.time_distribution.as_deref()
    }

    pub fn structured_filters(&self) -> &[String] {
        &self.structured_filters
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn total_pages(&self) -> u32 {
        total_pages(self.state.total_records, self.state.page_size)
    }

    /// Request for the current state; `all` and blank values are omitted
    pub fn build_request(&self) -> QueryRequest {
        let config = &K::CONFIG;
        let level = (!self.state.selected_level.eq_ignore_ascii_case(config.all_levels()))
            .then(|| self.state.selected_level.clone());
        let (level, status) = if config.filter_key == "status" {
            (None, level)
        } else {
            (level, None)
        };

        let query_id = Some(self.state.query_id_search.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let search = match query_id {
            Some(_) => None,
            None => Some(self.state.search_query.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        };

        QueryRequest {
            page: self.state.current_page,
            page_size: self.state.page_size,
            time_range: self.state.time_range,
            level,
            status,
            search,
            query_id,
            filters: self.structured_filters.clone(),
        }
    }

    /// Start a load. `None` while another load is outstanding.
    #[must_use]
    pub fn begin_load(&mut self) -> Option<PendingFetch<K::Record>> {
        if self.state.is_loading {
            debug!(stream = %K::CONFIG.kind, "Load already in progress, skipping");
            return None;
        }

        self.state.is_loading = true;
        self.records.clear();
        self.expanded.clear();
        self.selected = 0;
        self.seq += 1;

        let request = self.build_request();
        debug!(
            stream = %K::CONFIG.kind,
            seq = self.seq,
            page = request.page,
            time_range = %request.time_range,
            "Loading records"
        );
        metrics::counter!("observer_fetch_total", "stream" => K::CONFIG.kind.as_str()).increment(1);

        Some(PendingFetch {
            seq: self.seq,
            request,
            endpoint: K::CONFIG.endpoint,
            data_key: K::CONFIG.data_key,
            backend: Arc::clone(&self.backend),
            _record: PhantomData,
        })
    }

    /// Apply a finished fetch.
    ///
    /// When filters or paging changed while the fetch was in flight the page is
    /// discarded and a fetch for the current state is returned.
    #[must_use]
    pub fn finish_load(&mut self, outcome: FetchOutcome<K::Record>) -> Option<PendingFetch<K::Record>> {
        self.state.is_loading = false;

        if outcome.seq != self.seq || outcome.request != self.build_request() {
            debug!(
                stream = %K::CONFIG.kind,
                seq = outcome.seq,
                "Discarding stale response"
            );
            return self.begin_load();
        }

        match outcome.result {
            Ok(page) => {
                info!(
                    stream = %K::CONFIG.kind,
                    records = page.records.len(),
                    total = page.total,
                    "Records loaded"
                );
                self.records = page.records;
                self.state.total_records = page.total;
                self.stats = page.stats;
                self.time_distribution = page.time_distribution;
                self.last_error = None;
            }
            Err(e) => {
                warn!(stream = %K::CONFIG.kind, error = %e, "Failed to load records");
                metrics::counter!("observer_fetch_errors_total", "stream" => K::CONFIG.kind.as_str())
                    .increment(1);
                self.records.clear();
                self.state.total_records = 0;
                self.stats = Stats::default();
                self.time_distribution = None;
                self.last_error = Some(format!("Failed to load data: {e}"));
            }
        }
        None
    }

    /// Run `fetch` and any follow-ups to completion on the current task
    pub async fn drive(&mut self, fetch: Option<PendingFetch<K::Record>>) {
        let mut next = fetch;
        while let Some(fetch) = next {
            let outcome = fetch.execute().await;
            next = self.finish_load(outcome);
        }
    }

    /// Apply a search term: query ids go to `query_id_search`, anything else
    /// to `search_query`. Resets to page 1.
    #[must_use]
    pub fn set_search(&mut self, text: &str) -> Option<PendingFetch<K::Record>> {
        self.search_debounce.cancel();
        self.search_input = text.to_string();
        self.apply_search(text.trim().to_string())
    }

    fn apply_search(&mut self, value: String) -> Option<PendingFetch<K::Record>> {
        self.route_search(value);
        self.state.current_page = 1;
        self.begin_load()
    }

    fn route_search(&mut self, value: String) {
        if looks_like_query_id(&value) {
            debug!(stream = %K::CONFIG.kind, query_id = %value, "Search routed to query id");
            self.state.query_id_search = value.clone();
            self.state.search_query.clear();
        } else {
            self.state.search_query = value.clone();
            self.state.query_id_search.clear();
        }
        self.applied_search = value;
    }

    /// Set up the list without fetching; the next load uses these options
    pub fn apply_options(&mut self, options: ListOptions) {
        if let Some(level) = options.level {
            self.state.selected_level = level.trim().to_ascii_lowercase();
        }
        if let Some(range) = options.time_range {
            self.state.time_range = range;
        }
        if let Some(search) = options.search {
            self.search_input = search.clone();
            self.route_search(search.trim().to_string());
        }
        self.structured_filters = options.filters;
        self.state.current_page = options.page.max(1);
    }

    /// Record a keystroke in the search box; the value is applied once typing
    /// pauses for the debounce delay
    pub fn search_input_changed(&mut self, text: &str, now: Instant) {
        self.search_input = text.to_string();
        self.search_debounce.schedule(now, self.debounce_delay);
    }

    #[must_use]
    pub fn set_level_filter(&mut self, level: &str) -> Option<PendingFetch<K::Record>> {
        self.state.selected_level = level.trim().to_ascii_lowercase();
        self.state.current_page = 1;
        self.begin_load()
    }

    #[must_use]
    pub fn set_time_range(&mut self, range: TimeRange) -> Option<PendingFetch<K::Record>> {
        self.state.time_range = range;
        self.state.current_page = 1;
        self.begin_load()
    }

    #[must_use]
    pub fn set_structured_filters(&mut self, filters: Vec<String>) -> Option<PendingFetch<K::Record>> {
        debug!(stream = %K::CONFIG.kind, count = filters.len(), "Structured filters changed");
        self.structured_filters = filters;
        self.state.current_page = 1;
        self.begin_load()
    }

    /// Install (or clear) the periodic refresh, replacing any running timer
    pub fn set_auto_refresh(&mut self, refresh: AutoRefresh, now: Instant) {
        self.refresh_timer.cancel();
        self.state.auto_refresh = refresh;
        if let AutoRefresh::Every(period) = refresh {
            self.refresh_timer.start(now, period);
        }
        debug!(stream = %K::CONFIG.kind, auto_refresh = %refresh, "Auto-refresh updated");
    }

    /// Jump to a page, clamped to the available range, and reload it even when
    /// it is already shown. Filters are untouched.
    #[must_use]
    pub fn go_to_page(&mut self, page: u32) -> Option<PendingFetch<K::Record>> {
        self.state.current_page = page.clamp(1, self.total_pages().max(1));
        self.begin_load()
    }

    #[must_use]
    pub fn previous_page(&mut self) -> Option<PendingFetch<K::Record>> {
        if self.state.current_page <= 1 {
            return None;
        }
        self.go_to_page(self.state.current_page - 1)
    }

    #[must_use]
    pub fn next_page(&mut self) -> Option<PendingFetch<K::Record>> {
        if self.state.current_page >= self.total_pages() {
            return None;
        }
        self.go_to_page(self.state.current_page + 1)
    }

    /// Show only records of one query
    #[must_use]
    pub fn filter_by_query_id(&mut self, query_id: &str) -> Option<PendingFetch<K::Record>> {
        let query_id = query_id.trim();
        info!(stream = %K::CONFIG.kind, query_id, "Filtering by query id");
        self.search_debounce.cancel();
        self.search_input = query_id.to_string();
        self.applied_search = query_id.to_string();
        self.state.query_id_search = query_id.to_string();
        self.state.search_query.clear();
        self.state.current_page = 1;
        self.begin_load()
    }

    /// Drive the debounce and auto-refresh timers
    #[must_use]
    pub fn poll_timers(&mut self, now: Instant) -> Option<PendingFetch<K::Record>> {
        if self.search_debounce.poll(now) {
            let value = self.search_input.trim().to_string();
            if value != self.applied_search {
                return self.apply_search(value);
            }
        }

        if self.refresh_timer.poll(now) {
            if self.state.is_loading {
                return None;
            }
            if K::CONFIG.requires_connection && !self.connection.is_connected() {
                debug!(stream = %K::CONFIG.kind, "Skipping auto-refresh while disconnected");
                return None;
            }
            return self.begin_load();
        }
        None
    }

    /// Number of armed timers
    pub fn pending_timers(&self) -> usize {
        usize::from(self.search_debounce.is_pending()) + usize::from(self.refresh_timer.is_running())
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.records.len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Expand or collapse the selected record
    pub fn toggle_expanded(&mut self) {
        if self.selected >= self.records.len() {
            return;
        }
        if !self.expanded.remove(&self.selected) {
            self.expanded.insert(self.selected);
        }
    }

    /// Query id of the selected record with what following it should do
    pub fn selected_query_link(&self) -> Option<(QueryIdLink, String)> {
        let record = self.records.get(self.selected)?;
        let id = K::query_id(record).filter(|id| !id.is_empty())?;
        Some((K::CONFIG.query_id_link, id.to_string()))
    }

    fn highlight_term(&self) -> Option<&str> {
        Some(self.state.search_query.as_str()).filter(|s| !s.trim().is_empty())
    }
}

#[async_trait]
impl<K: RecordKind> RecordList for RecordListController<K> {
    async fn load_data(&mut self) {
        let fetch = self.begin_load();
        self.drive(fetch).await;
    }

    fn render(&self) -> ListView {
        let search = self.highlight_term();
        let rows = self
            .records
            .iter()
            .enumerate()
            .map(|(i, record)| RowView {
                record: K::view(record, search),
                expanded: self.expanded.contains(&i),
                selected: i == self.selected,
            })
            .collect();

        ListView {
            kind: K::CONFIG.kind,
            rows,
            pagination: PaginationView::new(
                self.state.current_page,
                self.state.page_size,
                self.state.total_records,
                K::CONFIG.item_name,
                self.active,
            ),
            stats: stat_counters(&K::CONFIG, &self.stats),
            chart: ChartView::new(&K::CONFIG, self.time_distribution(), self.state.total_records),
            is_loading: self.state.is_loading,
            error: self.last_error.clone(),
        }
    }

    fn data_key(&self) -> &'static str {
        K::CONFIG.data_key
    }

    fn filter_key(&self) -> &'static str {
        K::CONFIG.filter_key
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::{ConfigureResponse, ConnectionStatus};
    use crate::viewer::stream::{Logs, Queries};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;
    use serde_json::{json, Value};

    /// In-process backend recording every request it receives
    #[derive(Default)]
    pub(crate) struct FakeBackend {
        pub responses: Mutex<Vec<Result<Value>>>,
        pub requests: Mutex<Vec<(String, QueryRequest)>>,
    }

    impl FakeBackend {
        pub fn with_body(body: Value) -> Arc<Self> {
            let backend = Self::default();
            backend.responses.lock().push(Ok(body));
            Arc::new(backend)
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().len()
        }
    }

    #[async_trait]
    impl Backend for FakeBackend {
        async fn post_records(&self, endpoint: &str, request: &QueryRequest) -> Result<Value> {
            self.requests.lock().push((endpoint.to_string(), request.clone()));
            let mut responses = self.responses.lock();
            if responses.is_empty() {
                Ok(json!({"total": 0}))
            } else if responses.len() == 1 {
                match &responses[0] {
                    Ok(v) => Ok(v.clone()),
                    Err(e) => Err(Error::api(e.to_string())),
                }
            } else {
                responses.remove(0)
            }
        }

        async fn connection_status(&self) -> Result<ConnectionStatus> {
            Ok(ConnectionStatus::default())
        }

        async fn configure_connection(&self, _dsn: &str) -> Result<ConfigureResponse> {
            Ok(ConfigureResponse::default())
        }
    }

    fn three_logs() -> Value {
        json!({
            "logs": [
                {"timestamp": "2025-06-22 10:00:01", "log_level": "ERROR", "message": "boom"},
                {"timestamp": "2025-06-22 10:00:02", "log_level": "INFO", "message": "started"},
                {"timestamp": "2025-06-22 10:00:03", "log_level": "INFO", "message": "ready"}
            ],
            "total": 3,
            "stats": {"total": 3, "error": 1, "info": 2}
        })
    }

    fn logs(backend: Arc<FakeBackend>) -> RecordListController<Logs> {
        RecordListController::new(backend, ConnectionHandle::default(), &ViewerConfig::default())
    }

    fn with_total(total: u64) -> RecordListController<Logs> {
        let mut controller = logs(Arc::new(FakeBackend::default()));
        controller.state.total_records = total;
        controller
    }

    #[rstest]
    #[case("6ba7b810-9dad-11d1-80b4-00c04fd430c8", true)]
    #[case("6BA7B8109DAD11D180B400C04FD430C8", true)]
    #[case("123456", true)]
    #[case("12345", false)]
    #[case("connection refused", false)]
    #[case("6ba7b810-9dad-11d1-80b4", false)]
    #[case("１２３４５６", false)]
    #[case("\u{0661}\u{0662}\u{0663}\u{0664}\u{0665}\u{0666}", false)]
    fn test_query_id_detection(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(looks_like_query_id(input), expected);
    }

    #[tokio::test]
    async fn test_search_routes_query_ids() {
        let backend = Arc::new(FakeBackend::default());
        let mut controller = logs(Arc::clone(&backend));

        let fetch = controller.set_search("6ba7b810-9dad-11d1-80b4-00c04fd430c8");
        controller.drive(fetch).await;
        assert_eq!(controller.state().query_id_search, "6ba7b810-9dad-11d1-80b4-00c04fd430c8");
        assert_eq!(controller.state().search_query, "");

        let fetch = controller.set_search("  timeout ");
        controller.drive(fetch).await;
        assert_eq!(controller.state().query_id_search, "");
        assert_eq!(controller.state().search_query, "timeout");

        let requests = backend.requests.lock();
        assert_eq!(requests[0].1.query_id.as_deref(), Some("6ba7b810-9dad-11d1-80b4-00c04fd430c8"));
        assert_eq!(requests[0].1.search, None);
        assert_eq!(requests[1].1.search.as_deref(), Some("timeout"));
        assert_eq!(requests[1].1.query_id, None);
    }

    #[tokio::test]
    async fn test_filter_changes_reset_page() {
        let backend = FakeBackend::with_body(json!({"logs": [], "total": 1000}));
        let mut controller = logs(backend);
        controller.load_data().await;

        let fetch = controller.go_to_page(3);
        controller.drive(fetch).await;
        assert_eq!(controller.state().current_page, 3);

        let fetch = controller.set_level_filter("error");
        controller.drive(fetch).await;
        assert_eq!(controller.state().current_page, 1);
        assert_eq!(controller.state().selected_level, "error");

        let fetch = controller.next_page();
        controller.drive(fetch).await;
        assert_eq!(controller.state().current_page, 2);
        assert_eq!(controller.state().selected_level, "error");

        let fetch = controller.set_time_range(TimeRange::OneHour);
        controller.drive(fetch).await;
        assert_eq!(controller.state().current_page, 1);

        let _ = controller.go_to_page(4);
        controller.state.is_loading = false;
        let _ = controller.set_structured_filters(vec!["log_level = 'ERROR'".into()]);
        assert_eq!(controller.state().current_page, 1);
        controller.state.is_loading = false;

        let fetch = controller.go_to_page(3);
        controller.drive(fetch).await;
        let fetch = controller.set_search("timeout");
        controller.drive(fetch).await;
        assert_eq!(controller.state().current_page, 1);
        assert_eq!(controller.state().search_query, "timeout");

        let fetch = controller.go_to_page(3);
        controller.drive(fetch).await;
        let start = Instant::now();
        controller.search_input_changed("disk full", start);
        assert_eq!(controller.state().current_page, 3);
        let fetch = controller.poll_timers(start + Duration::from_secs(1));
        assert!(fetch.is_some());
        controller.drive(fetch).await;
        assert_eq!(controller.state().current_page, 1);
        assert_eq!(controller.state().search_query, "disk full");
    }

    #[test]
    fn test_paging_bounds_are_noops() {
        let mut controller = with_total(450);
        assert!(controller.previous_page().is_none());
        assert_eq!(controller.state().current_page, 1);

        controller.state.current_page = 3;
        assert!(controller.next_page().is_none());
        assert_eq!(controller.state().current_page, 3);

        let fetch = controller.go_to_page(99).expect("reloads the last page");
        assert_eq!(fetch.request().page, 3);
        assert_eq!(controller.state().current_page, 3);
    }

    #[tokio::test]
    async fn test_go_to_current_page_reloads() {
        let backend = FakeBackend::with_body(three_logs());
        let mut controller = logs(Arc::clone(&backend));
        controller.load_data().await;
        assert_eq!(backend.request_count(), 1);

        let fetch = controller.go_to_page(1);
        assert!(fetch.is_some());
        controller.drive(fetch).await;
        assert_eq!(backend.request_count(), 2);
        assert_eq!(controller.state().current_page, 1);
    }

    #[test]
    fn test_go_to_page_clamps() {
        let mut controller = with_total(450);
        let fetch = controller.go_to_page(99).expect("page changes");
        assert_eq!(fetch.request().page, 3);
        controller.state.is_loading = false;
        let fetch = controller.go_to_page(0).expect("page changes");
        assert_eq!(fetch.request().page, 1);
    }

    #[test]
    fn test_load_while_loading_is_rejected() {
        let backend = Arc::new(FakeBackend::default());
        let mut controller = logs(Arc::clone(&backend));
        let first = controller.begin_load();
        assert!(first.is_some());

        let before = controller.state().clone();
        assert!(controller.begin_load().is_none());
        assert_eq!(controller.state(), &before);
        assert_eq!(backend.request_count(), 0);
    }

    #[tokio::test]
    async fn test_load_data_while_loading_sends_nothing() {
        let backend = Arc::new(FakeBackend::default());
        let mut controller = logs(Arc::clone(&backend));
        let _pending = controller.begin_load();
        let before = controller.state().clone();

        controller.load_data().await;

        assert_eq!(backend.request_count(), 0);
        assert_eq!(controller.state(), &before);
    }

    #[tokio::test]
    async fn test_render_after_load() {
        let mut controller = logs(FakeBackend::with_body(three_logs()));
        controller.set_active(true);
        controller.load_data().await;

        let view = controller.render();
        assert_eq!(view.rows.len(), 3);
        assert_eq!(view.pagination.summary, "Showing 1-3 of 3 logs");
        assert!(view.pagination.visible);
        let counters: Vec<_> = view
            .stats
            .iter()
            .filter(|c| c.key == "error" || c.key == "info")
            .map(|c| c.value.as_str())
            .collect();
        assert_eq!(counters, vec!["1", "2"]);
        assert!(!view.is_loading);
        assert!(view.chart.is_empty());
    }

    #[tokio::test]
    async fn test_failure_surfaces_message_and_resets() {
        let backend = Arc::new(FakeBackend::default());
        backend.responses.lock().push(Ok(three_logs()));
        backend
            .responses
            .lock()
            .push(Err(Error::status(500, "Internal Server Error")));
        let mut controller = logs(Arc::clone(&backend));

        controller.load_data().await;
        assert_eq!(controller.records().len(), 3);

        controller.load_data().await;
        assert_eq!(
            controller.last_error(),
            Some("Failed to load data: HTTP 500: Internal Server Error")
        );
        assert!(controller.records().is_empty());
        assert_eq!(controller.state().total_records, 0);
        assert!(!controller.state().is_loading);
    }

    #[tokio::test]
    async fn test_error_payload_is_a_failure() {
        let backend = FakeBackend::with_body(json!({"error": "Database not connected", "logs": [], "total": 0}));
        let mut controller = logs(backend);
        controller.load_data().await;
        assert_eq!(controller.last_error(), Some("Failed to load data: Database not connected"));
    }

    #[tokio::test]
    async fn test_stale_response_triggers_refetch() {
        let backend = Arc::new(FakeBackend::default());
        let mut controller = logs(Arc::clone(&backend));

        let fetch = controller.begin_load().expect("idle");
        // changed while the first fetch is in flight
        assert!(controller.set_level_filter("error").is_none());

        let outcome = fetch.execute().await;
        let follow_up = controller.finish_load(outcome).expect("refetch");
        assert_eq!(follow_up.request().level.as_deref(), Some("error"));
        controller.drive(Some(follow_up)).await;
        assert_eq!(backend.request_count(), 2);
        assert!(!controller.state().is_loading);
    }

    #[test]
    fn test_request_omits_all_level_and_uses_status_key() {
        let mut queries: RecordListController<Queries> = RecordListController::new(
            Arc::new(FakeBackend::default()),
            ConnectionHandle::default(),
            &ViewerConfig::default(),
        );
        assert_eq!(queries.build_request().status, None);

        let fetch = queries.set_level_filter("success").expect("idle");
        assert_eq!(fetch.request().status.as_deref(), Some("success"));
        assert_eq!(fetch.request().level, None);
        assert_eq!(queries.filter_key(), "status");
        assert_eq!(queries.data_key(), "queries");
    }

    #[test]
    fn test_search_debounce() {
        let start = Instant::now();
        let mut controller = with_total(0);

        controller.search_input_changed("time", start);
        controller.search_input_changed("timeout", start + Duration::from_millis(200));
        assert!(controller.poll_timers(start + Duration::from_millis(400)).is_none());

        let fetch = controller
            .poll_timers(start + Duration::from_millis(500))
            .expect("debounced search applied");
        assert_eq!(fetch.request().search.as_deref(), Some("timeout"));
        controller.state.is_loading = false;

        // same value again: nothing to do
        controller.search_input_changed("timeout ", start + Duration::from_secs(1));
        assert!(controller.poll_timers(start + Duration::from_secs(2)).is_none());
    }

    #[test]
    fn test_auto_refresh_then_off_leaves_no_timers() {
        let now = Instant::now();
        let mut controller = with_total(0);
        controller.set_auto_refresh(AutoRefresh::seconds(5), now);
        assert_eq!(controller.pending_timers(), 1);
        controller.set_auto_refresh(AutoRefresh::Off, now);
        assert_eq!(controller.pending_timers(), 0);
        assert!(controller.poll_timers(now + Duration::from_secs(60)).is_none());
    }

    #[test]
    fn test_auto_refresh_skips_when_busy_or_disconnected() {
        let now = Instant::now();
        let mut queries: RecordListController<Queries> = RecordListController::new(
            Arc::new(FakeBackend::default()),
            ConnectionHandle::default(),
            &ViewerConfig::default(),
        );
        queries.set_auto_refresh(AutoRefresh::seconds(5), now);
        assert!(queries.poll_timers(now + Duration::from_secs(5)).is_none());

        queries.connection.set(ConnectionStatus {
            connected: true,
            ..Default::default()
        });
        assert!(queries.poll_timers(now + Duration::from_secs(10)).is_some());
        // still loading from the previous tick
        assert!(queries.poll_timers(now + Duration::from_secs(15)).is_none());
    }

    #[test]
    fn test_filter_by_query_id() {
        let mut controller = with_total(500);
        controller.state.current_page = 2;
        controller.state.search_query = "boom".into();

        let fetch = controller.filter_by_query_id("abc-1").expect("idle");
        assert_eq!(fetch.request().query_id.as_deref(), Some("abc-1"));
        assert_eq!(fetch.request().search, None);
        assert_eq!(fetch.request().page, 1);
        assert_eq!(controller.search_input(), "abc-1");
    }

    #[tokio::test]
    async fn test_apply_options_loads_once() {
        let backend = Arc::new(FakeBackend::default());
        let mut controller = logs(Arc::clone(&backend));

        controller.apply_options(ListOptions {
            page: 3,
            level: Some("ERROR".into()),
            time_range: Some(TimeRange::ALL[3]),
            search: Some("1234567".into()),
            filters: vec!["duration_ms > 10".into()],
        });
        controller.load_data().await;

        let requests = backend.requests.lock();
        assert_eq!(requests.len(), 1);
        let request = &requests[0].1;
        assert_eq!(request.page, 3);
        assert_eq!(request.level.as_deref(), Some("error"));
        assert_eq!(request.time_range, TimeRange::ALL[3]);
        assert_eq!(request.query_id.as_deref(), Some("1234567"));
        assert_eq!(request.filters, vec!["duration_ms > 10".to_string()]);
    }

    proptest! {
        #[test]
        fn prop_digit_runs_are_query_ids(digits in "[0-9]{6,40}") {
            prop_assert!(looks_like_query_id(&digits));
        }

        #[test]
        fn prop_short_digit_runs_are_search_terms(digits in "[0-9]{1,5}") {
            prop_assert!(!looks_like_query_id(&digits));
        }

        #[test]
        fn prop_paging_stays_in_bounds(total in 0u64..5_000, moves in prop::collection::vec(0u8..3, 0..40)) {
            let mut controller = with_total(total);
            let filters_before = controller.build_request();
            for m in moves {
                let _ = match m {
                    0 => controller.next_page(),
                    1 => controller.previous_page(),
                    _ => controller.go_to_page(u32::from(m) * 7),
                };
                controller.state.is_loading = false;
                let page = controller.state().current_page;
                prop_assert!(page >= 1);
                prop_assert!(page <= controller.total_pages().max(1));
            }
            let after = controller.build_request();
            prop_assert_eq!(after.level, filters_before.level);
            prop_assert_eq!(after.search, filters_before.search);
            prop_assert_eq!(after.filters, filters_before.filters);
        }
    }
}
