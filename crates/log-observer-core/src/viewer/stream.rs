//! Per-stream configuration for the generic record list

use ratatui::style::Color;
use serde::de::DeserializeOwned;

use crate::models::{LogRecord, QueryRecord, StreamKind};

use super::render::{self, RecordView};

/// What clicking a record's query id does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryIdLink {
    /// Filter this same list by the id
    FilterSelf,
    /// Switch to the logs tab filtered by the id
    JumpToLogs,
}

/// Everything that differs between the logs and queries lists
#[derive(Debug, Clone, Copy)]
pub struct StreamConfig {
    pub kind: StreamKind,
    /// Backend endpoint receiving the `POST`
    pub endpoint: &'static str,
    /// Response member holding the record array
    pub data_key: &'static str,
    /// Request member carrying the level/status selection
    pub filter_key: &'static str,
    /// Plural noun used in the pagination summary
    pub item_name: &'static str,
    /// Selectable level/status values; the first is the "no filter" value
    pub levels: &'static [&'static str],
    /// Stacking order and colors of the time-distribution chart
    pub chart_categories: &'static [(&'static str, Color)],
    /// Preview length in characters before truncation
    pub preview_limit: usize,
    /// Auto-refresh is skipped while the backend is disconnected
    pub requires_connection: bool,
    pub query_id_link: QueryIdLink,
}

impl StreamConfig {
    /// The value meaning "no level filter"
    pub fn all_levels(&self) -> &'static str {
        self.levels.first().copied().unwrap_or("all")
    }

    pub fn is_known_level(&self, level: &str) -> bool {
        self.levels.iter().any(|l| l.eq_ignore_ascii_case(level))
    }

    /// Next level in selector order, wrapping around
    pub fn next_level(&self, current: &str) -> &'static str {
        let idx = self.levels.iter().position(|l| *l == current).unwrap_or(0);
        self.levels[(idx + 1) % self.levels.len()]
    }
}

pub const LOGS: StreamConfig = StreamConfig {
    kind: StreamKind::Logs,
    endpoint: "/api/logs",
    data_key: "logs",
    filter_key: "level",
    item_name: "logs",
    levels: &["all", "error", "warning", "info", "debug"],
    chart_categories: &[
        ("error", Color::Red),
        ("warning", Color::Yellow),
        ("info", Color::Cyan),
        ("debug", Color::DarkGray),
    ],
    preview_limit: 150,
    requires_connection: false,
    query_id_link: QueryIdLink::FilterSelf,
};

pub const QUERIES: StreamConfig = StreamConfig {
    kind: StreamKind::Queries,
    endpoint: "/api/queries",
    data_key: "queries",
    filter_key: "status",
    item_name: "queries",
    levels: &["all", "success", "error"],
    chart_categories: &[("success", Color::Green), ("error", Color::Red)],
    preview_limit: 120,
    requires_connection: true,
    query_id_link: QueryIdLink::JumpToLogs,
};

/// A record stream the list controller can be instantiated for
pub trait RecordKind: Send + Sync + 'static {
    type Record: DeserializeOwned + Clone + Send + Sync + 'static;

    const CONFIG: StreamConfig;

    /// Render-ready view of one record, highlighting `search` when given
    fn view(record: &Self::Record, search: Option<&str>) -> RecordView;

    fn query_id(record: &Self::Record) -> Option<&str>;
}

/// Log history
#[derive(Debug, Clone, Copy, Default)]
pub struct Logs;

impl RecordKind for Logs {
    type Record = LogRecord;

    const CONFIG: StreamConfig = LOGS;

    fn view(record: &LogRecord, search: Option<&str>) -> RecordView {
        render::log_view(record, search, LOGS.preview_limit)
    }

    fn query_id(record: &LogRecord) -> Option<&str> {
        record.query_id.as_deref()
    }
}

/// Query history
#[derive(Debug, Clone, Copy, Default)]
pub struct Queries;

impl RecordKind for Queries {
    type Record = QueryRecord;

    const CONFIG: StreamConfig = QUERIES;

    fn view(record: &QueryRecord, search: Option<&str>) -> RecordView {
        render::query_view(record, search, QUERIES.preview_limit)
    }

    fn query_id(record: &QueryRecord) -> Option<&str> {
        record.query_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_keys() {
        assert_eq!(LOGS.data_key, "logs");
        assert_eq!(LOGS.filter_key, "level");
        assert_eq!(QUERIES.data_key, "queries");
        assert_eq!(QUERIES.filter_key, "status");
        assert_eq!(Logs::CONFIG.kind, StreamKind::Logs);
        assert_eq!(Queries::CONFIG.kind, StreamKind::Queries);
    }

    #[test]
    fn test_level_cycle() {
        assert_eq!(LOGS.all_levels(), "all");
        assert_eq!(LOGS.next_level("all"), "error");
        assert_eq!(LOGS.next_level("debug"), "all");
        assert_eq!(QUERIES.next_level("error"), "all");
        assert!(QUERIES.is_known_level("SUCCESS"));
        assert!(!QUERIES.is_known_level("warning"));
    }
}
