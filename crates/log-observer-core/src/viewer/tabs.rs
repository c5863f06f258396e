//! Logs / queries tab switching

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::client::{Backend, ConnectionHandle};
use crate::config::ViewerConfig;
use crate::models::{AutoRefresh, LogRecord, QueryRecord, StreamKind, TimeRange};

use super::controller::{FetchOutcome, ListView, PendingFetch, RecordList, RecordListController};
use super::stream::{Logs, Queries, QueryIdLink};

/// A fetch issued by either list
#[derive(Debug)]
pub enum TabFetch {
    Logs(PendingFetch<LogRecord>),
    Queries(PendingFetch<QueryRecord>),
}

impl TabFetch {
    pub fn kind(&self) -> StreamKind {
        match self {
            Self::Logs(_) => StreamKind::Logs,
            Self::Queries(_) => StreamKind::Queries,
        }
    }

    pub async fn execute(self) -> TabOutcome {
        match self {
            Self::Logs(fetch) => TabOutcome::Logs(fetch.execute().await),
            Self::Queries(fetch) => TabOutcome::Queries(fetch.execute().await),
        }
    }
}

/// A finished [`TabFetch`]
#[derive(Debug)]
pub enum TabOutcome {
    Logs(FetchOutcome<LogRecord>),
    Queries(FetchOutcome<QueryRecord>),
}

impl TabOutcome {
    pub fn kind(&self) -> StreamKind {
        match self {
            Self::Logs(_) => StreamKind::Logs,
            Self::Queries(_) => StreamKind::Queries,
        }
    }

    pub fn is_ok(&self) -> bool {
        match self {
            Self::Logs(outcome) => outcome.is_ok(),
            Self::Queries(outcome) => outcome.is_ok(),
        }
    }
}

/// Run `$body` against the active controller and tag the resulting fetch
macro_rules! on_active {
    ($self:ident, $c:ident => $body:expr) => {
        match $self.active {
            StreamKind::Logs => {
                let $c = &mut $self.logs;
                $body.map(TabFetch::Logs)
            }
            StreamKind::Queries => {
                let $c = &mut $self.queries;
                $body.map(TabFetch::Queries)
            }
        }
    };
}

/// Owns both record lists; exactly one of them is visible
#[derive(Debug)]
pub struct TabCoordinator {
    logs: RecordListController<Logs>,
    queries: RecordListController<Queries>,
    active: StreamKind,
}

impl TabCoordinator {
    /// Both lists share one backend and connection; logs starts active
    pub fn new(backend: Arc<dyn Backend>, connection: ConnectionHandle, config: &ViewerConfig) -> Self {
        let mut logs = RecordListController::new(Arc::clone(&backend), connection.clone(), config);
        logs.set_active(true);
        let queries = RecordListController::new(backend, connection, config);

        Self {
            logs,
            queries,
            active: StreamKind::Logs,
        }
    }

    pub fn active_tab(&self) -> StreamKind {
        self.active
    }

    pub fn logs(&self) -> &RecordListController<Logs> {
        &self.logs
    }

    pub fn logs_mut(&mut self) -> &mut RecordListController<Logs> {
        &mut self.logs
    }

    pub fn queries(&self) -> &RecordListController<Queries> {
        &self.queries
    }

    pub fn queries_mut(&mut self) -> &mut RecordListController<Queries> {
        &mut self.queries
    }

    pub fn active_list(&self) -> &dyn RecordList {
        match self.active {
            StreamKind::Logs => &self.logs,
            StreamKind::Queries => &self.queries,
        }
    }

    pub fn render_active(&self) -> ListView {
        self.active_list().render()
    }

    /// Show `tab` and hide the other. Activating queries (re)loads it.
    #[must_use]
    pub fn set_active_tab(&mut self, tab: StreamKind) -> Option<TabFetch> {
        debug!(tab = %tab, "Switching tab");
        self.active = tab;
        self.logs.set_active(tab == StreamKind::Logs);
        self.queries.set_active(tab == StreamKind::Queries);

        match tab {
            StreamKind::Logs => None,
            StreamKind::Queries => self.queries.begin_load().map(TabFetch::Queries),
        }
    }

    /// Switch to logs filtered to one query
    #[must_use]
    pub fn follow_query_id(&mut self, query_id: &str) -> Option<TabFetch> {
        let _ = self.set_active_tab(StreamKind::Logs);
        self.logs.filter_by_query_id(query_id).map(TabFetch::Logs)
    }

    /// Follow the query id of the selected record in the active list
    #[must_use]
    pub fn follow_selected_query_id(&mut self) -> Option<TabFetch> {
        let link = match self.active {
            StreamKind::Logs => self.logs.selected_query_link(),
            StreamKind::Queries => self.queries.selected_query_link(),
        };
        match link? {
            (QueryIdLink::FilterSelf, id) => on_active!(self, c => c.filter_by_query_id(&id)),
            (QueryIdLink::JumpToLogs, id) => self.follow_query_id(&id),
        }
    }

    /// Hand a finished fetch back to its list
    #[must_use]
    pub fn finish(&mut self, outcome: TabOutcome) -> Option<TabFetch> {
        match outcome {
            TabOutcome::Logs(outcome) => self.logs.finish_load(outcome).map(TabFetch::Logs),
            TabOutcome::Queries(outcome) => self.queries.finish_load(outcome).map(TabFetch::Queries),
        }
    }

    /// Run a fetch and its follow-ups on the current task
    pub async fn drive(&mut self, fetch: Option<TabFetch>) {
        let mut next = fetch;
        while let Some(fetch) = next {
            let outcome = fetch.execute().await;
            next = self.finish(outcome);
        }
    }

    /// Load the active list
    #[must_use]
    pub fn reload(&mut self) -> Option<TabFetch> {
        on_active!(self, c => c.begin_load())
    }

    pub fn search_input_changed(&mut self, text: &str, now: Instant) {
        match self.active {
            StreamKind::Logs => self.logs.search_input_changed(text, now),
            StreamKind::Queries => self.queries.search_input_changed(text, now),
        }
    }

    #[must_use]
    pub fn set_search(&mut self, text: &str) -> Option<TabFetch> {
        on_active!(self, c => c.set_search(text))
    }

    #[must_use]
    pub fn set_level_filter(&mut self, level: &str) -> Option<TabFetch> {
        on_active!(self, c => c.set_level_filter(level))
    }

    /// Move the active list to its next level/status choice
    #[must_use]
    pub fn cycle_level(&mut self) -> Option<TabFetch> {
        on_active!(self, c => {
            let next = c.config().next_level(&c.state().selected_level);
            c.set_level_filter(next)
        })
    }

    #[must_use]
    pub fn set_time_range(&mut self, range: TimeRange) -> Option<TabFetch> {
        on_active!(self, c => c.set_time_range(range))
    }

    /// Replace the structured filters of one list
    #[must_use]
    pub fn set_structured_filters(&mut self, kind: StreamKind, filters: Vec<String>) -> Option<TabFetch> {
        match kind {
            StreamKind::Logs => self.logs.set_structured_filters(filters).map(TabFetch::Logs),
            StreamKind::Queries => self
                .queries
                .set_structured_filters(filters)
                .map(TabFetch::Queries),
        }
    }

    pub fn set_auto_refresh(&mut self, refresh: AutoRefresh, now: Instant) {
        match self.active {
            StreamKind::Logs => self.logs.set_auto_refresh(refresh, now),
            StreamKind::Queries => self.queries.set_auto_refresh(refresh, now),
        }
    }

    pub fn active_auto_refresh(&self) -> AutoRefresh {
        match self.active {
            StreamKind::Logs => self.logs.state().auto_refresh,
            StreamKind::Queries => self.queries.state().auto_refresh,
        }
    }

    #[must_use]
    pub fn go_to_page(&mut self, page: u32) -> Option<TabFetch> {
        on_active!(self, c => c.go_to_page(page))
    }

    #[must_use]
    pub fn next_page(&mut self) -> Option<TabFetch> {
        on_active!(self, c => c.next_page())
    }

    #[must_use]
    pub fn previous_page(&mut self) -> Option<TabFetch> {
        on_active!(self, c => c.previous_page())
    }

    pub fn select_next(&mut self) {
        match self.active {
            StreamKind::Logs => self.logs.select_next(),
            StreamKind::Queries => self.queries.select_next(),
        }
    }

    pub fn select_previous(&mut self) {
        match self.active {
            StreamKind::Logs => self.logs.select_previous(),
            StreamKind::Queries => self.queries.select_previous(),
        }
    }

    pub fn toggle_expanded(&mut self) {
        match self.active {
            StreamKind::Logs => self.logs.toggle_expanded(),
            StreamKind::Queries => self.queries.toggle_expanded(),
        }
    }

    /// Drive both lists' timers; each may produce a fetch
    pub fn poll_timers(&mut self, now: Instant) -> Vec<TabFetch> {
        let logs = self.logs.poll_timers(now).map(TabFetch::Logs);
        let queries = self.queries.poll_timers(now).map(TabFetch::Queries);
        logs.into_iter().chain(queries).collect()
    }

    pub fn pending_timers(&self) -> usize {
        self.logs.pending_timers() + self.queries.pending_timers()
    }
}
