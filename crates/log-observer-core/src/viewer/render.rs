//! Render-ready view models
//!
//! Everything here is plain data derived from controller state. The terminal
//! front-end only maps these onto widgets, which keeps layout decisions
//! (truncation, highlighting, pager window, chart geometry) testable without a
//! terminal.

use ratatui::style::Color;

use crate::models::{LogRecord, QueryRecord, Stats, TimeBucket};

use super::format::{
    format_bytes, format_millis, format_number, format_rounded, format_timestamp, pretty_message,
    single_line, statement_type, truncate, Performance,
};
use super::stream::StreamConfig;

/// A run of text, optionally matching the active search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub highlighted: bool,
}

impl Segment {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            highlighted: false,
        }
    }
}

/// Split `text` into segments, marking case-insensitive occurrences of `query`
pub fn highlight(text: &str, query: Option<&str>) -> Vec<Segment> {
    let needle: Vec<char> = match query.map(str::trim) {
        Some(q) if !q.is_empty() => q.chars().collect(),
        _ => return vec![Segment::plain(text)],
    };
    let chars: Vec<(usize, char)> = text.char_indices().collect();

    let matches_at = |i: usize| {
        i + needle.len() <= chars.len()
            && needle
                .iter()
                .zip(&chars[i..])
                .all(|(n, (_, c))| n.to_lowercase().eq(c.to_lowercase()))
    };

    let mut segments = Vec::new();
    let mut plain_start = 0;
    let mut i = 0;
    while i < chars.len() {
        if matches_at(i) {
            let start = chars[i].0;
            let end = chars.get(i + needle.len()).map_or(text.len(), |(b, _)| *b);
            if start > plain_start {
                segments.push(Segment::plain(&text[plain_start..start]));
            }
            segments.push(Segment {
                text: text[start..end].to_string(),
                highlighted: true,
            });
            plain_start = end;
            i += needle.len();
        } else {
            i += 1;
        }
    }
    if plain_start < text.len() || segments.is_empty() {
        segments.push(Segment::plain(&text[plain_start..]));
    }
    segments
}

/// Colored label at the start of a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub label: String,
    /// Chart/category key used for coloring (`error`, `info`, `success`, ...)
    pub category: String,
}

/// One record as the list shows it
#[derive(Debug, Clone, PartialEq)]
pub struct RecordView {
    pub badge: Badge,
    pub timestamp: String,
    pub query_id: Option<String>,
    /// Short facts shown ahead of the preview (statement type, latency, ...)
    pub chips: Vec<String>,
    pub preview: Vec<Segment>,
    pub truncated: bool,
    /// Full content shown when expanded
    pub body: Vec<Segment>,
    pub meta: Vec<(&'static str, String)>,
}

impl RecordView {
    /// Preview text without highlight markers
    pub fn preview_text(&self) -> String {
        self.preview.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn body_text(&self) -> String {
        self.body.iter().map(|s| s.text.as_str()).collect()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

pub fn log_view(log: &LogRecord, search: Option<&str>, preview_limit: usize) -> RecordView {
    let message = log.display_message();
    let (preview, truncated) = truncate(&single_line(message), preview_limit);

    let mut meta = Vec::new();
    if let Some(target) = non_empty(log.target.as_deref()) {
        meta.push(("Target", target.to_string()));
    }
    if let Some(path) = non_empty(log.path.as_deref()) {
        meta.push(("Path", path.to_string()));
    }
    if let Some(cluster) = non_empty(log.cluster_id.as_deref()) {
        meta.push(("Cluster", cluster.to_string()));
    }

    RecordView {
        badge: Badge {
            label: log
                .log_level
                .clone()
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| "INFO".to_string()),
            category: log.level_category(),
        },
        timestamp: format_timestamp(log.timestamp.as_deref(), false),
        query_id: non_empty(log.query_id.as_deref()).map(str::to_string),
        chips: Vec::new(),
        preview: highlight(&preview, search),
        truncated,
        body: highlight(&pretty_message(message), search),
        meta,
    }
}

pub fn query_view(query: &QueryRecord, search: Option<&str>, preview_limit: usize) -> RecordView {
    let sql = query.sql();
    let (preview, truncated) = truncate(&single_line(sql), preview_limit);
    let status = query.status_category();

    let mut chips = vec![statement_type(sql).to_string()];
    if let Some(ms) = query.duration() {
        chips.push(format!(
            "{} ms ({})",
            format_millis(ms),
            Performance::classify(ms).label()
        ));
    }
    if let Some(rows) = query.scan_rows.filter(|r| *r > 0) {
        chips.push(format!("{} rows", format_number(rows)));
    }
    if let Some(bytes) = query.result_bytes.filter(|b| *b > 0) {
        chips.push(format_bytes(bytes));
    }

    let mut meta = Vec::new();
    if let Some(start) = query.started_at() {
        meta.push(("Start Time", format_timestamp(Some(start), true)));
    }
    if let Some(ms) = query.duration().filter(|ms| *ms > 0.0) {
        meta.push(("Duration", format!("{} ms", format_millis(ms))));
    }
    if let Some(user) = non_empty(query.sql_user.as_deref()) {
        meta.push(("User", user.to_string()));
    }
    if let Some(db) = non_empty(query.current_database.as_deref()) {
        meta.push(("Database", db.to_string()));
    }
    let counters = [
        ("Result Rows", query.result_rows, false),
        ("Result Size", query.result_bytes, true),
        ("Scanned Rows", query.scan_rows, false),
        ("Scanned Data", query.scan_bytes, true),
    ];
    for (label, value, bytes) in counters {
        if let Some(v) = value.filter(|v| *v > 0) {
            meta.push((label, if bytes { format_bytes(v) } else { format_number(v) }));
        }
    }
    if let Some(err) = non_empty(query.exception_text.as_deref()) {
        meta.push(("Error", err.to_string()));
    }
    if let Some(id) = non_empty(query.query_id.as_deref()) {
        meta.push(("Query ID", id.to_string()));
    }
    if let Some(code) = query.exception_code.filter(|c| *c != 0) {
        meta.push(("Exception Code", code.to_string()));
    }

    RecordView {
        badge: Badge {
            label: status.to_ascii_uppercase(),
            category: status.to_string(),
        },
        timestamp: format_timestamp(query.started_at(), false),
        query_id: non_empty(query.query_id.as_deref()).map(str::to_string),
        chips,
        preview: highlight(&preview, search),
        truncated,
        body: highlight(sql, search),
        meta,
    }
}

/// Pager state for the footer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationView {
    pub summary: String,
    pub current_page: u32,
    pub total_pages: u32,
    /// At most five page numbers around the current page
    pub pages: Vec<u32>,
    pub has_prev: bool,
    pub has_next: bool,
    pub visible: bool,
}

/// Number of pages needed for `total` records
pub fn total_pages(total: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    u32::try_from(total.div_ceil(u64::from(page_size))).unwrap_or(u32::MAX)
}

impl PaginationView {
    const WINDOW: u32 = 5;

    pub fn new(current_page: u32, page_size: u32, total: u64, item_name: &str, active: bool) -> Self {
        let total_pages = total_pages(total, page_size);
        let summary = if total == 0 {
            format!("No {item_name} found")
        } else {
            let start = u64::from(current_page.saturating_sub(1)) * u64::from(page_size) + 1;
            let end = (u64::from(current_page) * u64::from(page_size)).min(total);
            format!("Showing {start}-{end} of {} {item_name}", format_number(total))
        };

        let mut first = current_page.saturating_sub(2).max(1);
        let last = total_pages.min(first + Self::WINDOW - 1);
        if last + 1 < first + Self::WINDOW {
            first = (last + 1).saturating_sub(Self::WINDOW).max(1);
        }
        let pages = if total_pages <= 1 {
            Vec::new()
        } else {
            (first..=last).collect()
        };

        Self {
            summary,
            current_page,
            total_pages,
            pages,
            has_prev: current_page > 1,
            has_next: current_page < total_pages,
            visible: total > 0 && active,
        }
    }
}

/// One counter of the stats strip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatCounter {
    pub key: &'static str,
    pub label: &'static str,
    pub value: String,
}

/// Counters shown above the list, in display order
pub fn stat_counters(config: &StreamConfig, stats: &Stats) -> Vec<StatCounter> {
    let counter = |key: &'static str, label: &'static str| StatCounter {
        key,
        label,
        value: format_number(stats.count(key)),
    };

    let mut counters = vec![counter("total", "Total")];
    for (key, _) in config.chart_categories {
        let label = match *key {
            "error" => "Errors",
            "warning" => "Warnings",
            "info" => "Info",
            "debug" => "Debug",
            "success" => "Success",
            _ => key,
        };
        counters.push(counter(key, label));
    }
    if let Some(avg) = stats.get("avgDuration") {
        counters.push(StatCounter {
            key: "avgDuration",
            label: "Avg Duration",
            value: format!("{} ms", format_rounded(avg)),
        });
    }
    counters
}

/// One category slice of a bar
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSegment {
    pub category: &'static str,
    pub color: Color,
    pub count: u64,
    /// Fraction of the bucket total, 0..=1
    pub share: f64,
    /// Height relative to the chart, 0..=100
    pub height_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartBar {
    pub label: String,
    pub total: u64,
    pub height_pct: f64,
    /// Bottom-up stacking order
    pub segments: Vec<ChartSegment>,
    pub tooltip: Vec<String>,
}

/// Time-distribution chart
#[derive(Debug, Clone, PartialEq)]
pub struct ChartView {
    pub title: String,
    pub bars: Vec<ChartBar>,
}

impl ChartView {
    pub const NO_DATA: &'static str = "No data available";

    pub fn new(config: &StreamConfig, buckets: Option<&[TimeBucket]>, total_records: u64) -> Self {
        let title = format!("{total_records} Results");
        let buckets = buckets.unwrap_or_default();
        let max = buckets.iter().map(|b| b.total).max().unwrap_or(0);

        let bars = buckets
            .iter()
            .map(|bucket| {
                let height_pct = if max > 0 {
                    bucket.total as f64 / max as f64 * 100.0
                } else {
                    0.0
                };
                let segments = config
                    .chart_categories
                    .iter()
                    .filter_map(|(category, color)| {
                        let count = bucket.count(category);
                        if count == 0 || bucket.total == 0 {
                            return None;
                        }
                        let share = count as f64 / bucket.total as f64;
                        Some(ChartSegment {
                            category,
                            color: *color,
                            count,
                            share,
                            height_pct: share * height_pct,
                        })
                    })
                    .collect::<Vec<_>>();

                let label = format_timestamp(Some(&bucket.time_bucket), false);
                let mut tooltip = vec![label.clone(), format!("Total: {}", bucket.total)];
                tooltip.extend(segments.iter().map(|s| {
                    let mut name = s.category.to_string();
                    if let Some(first) = name.get_mut(0..1) {
                        first.make_ascii_uppercase();
                    }
                    format!("{name}: {}", s.count)
                }));

                ChartBar {
                    label,
                    total: bucket.total,
                    height_pct,
                    segments,
                    tooltip,
                }
            })
            .collect();

        Self { title, bars }
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::stream::{LOGS, QUERIES};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_highlight_is_case_insensitive() {
        let segments = highlight("Connection ERROR: error", Some("error"));
        let marked: Vec<_> = segments
            .iter()
            .filter(|s| s.highlighted)
            .map(|s| s.text.as_str())
            .collect();
        assert_eq!(marked, vec!["ERROR", "error"]);
        let joined: String = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(joined, "Connection ERROR: error");
    }

    #[test]
    fn test_highlight_without_query() {
        assert_eq!(highlight("abc", None), vec![Segment::plain("abc")]);
        assert_eq!(highlight("abc", Some("  ")), vec![Segment::plain("abc")]);
    }

    #[test]
    fn test_log_view() {
        let log = LogRecord {
            log_level: Some("WARN".into()),
            message: Some("x".repeat(200)),
            target: Some("databend_query::servers".into()),
            cluster_id: Some("c1".into()),
            ..Default::default()
        };
        let view = log_view(&log, None, 150);
        assert_eq!(view.badge.label, "WARN");
        assert_eq!(view.badge.category, "warning");
        assert!(view.truncated);
        assert_eq!(view.preview_text().chars().count(), 153);
        assert_eq!(
            view.meta,
            vec![("Target", "databend_query::servers".to_string()), ("Cluster", "c1".to_string())]
        );
    }

    #[test]
    fn test_query_view() {
        let query = QueryRecord {
            query_id: Some("q-1".into()),
            query_text: Some("select count(*) from t".into()),
            duration_ms: Some(1500.0),
            result_bytes: Some(2048),
            exception_code: Some(1025),
            exception_text: Some("Unknown table".into()),
            ..Default::default()
        };
        let view = query_view(&query, Some("COUNT"), 120);
        assert_eq!(view.badge.label, "ERROR");
        assert_eq!(view.chips, vec!["SELECT", "1,500 ms (slow)", "2 KB"]);
        assert!(view.preview.iter().any(|s| s.highlighted && s.text == "count"));
        let labels: Vec<_> = view.meta.iter().map(|(l, _)| *l).collect();
        assert_eq!(
            labels,
            vec!["Duration", "Result Size", "Error", "Query ID", "Exception Code"]
        );
    }

    #[rstest]
    #[case(1, 1, vec![])]
    #[case(1, 3, vec![1, 2, 3])]
    #[case(1, 10, vec![1, 2, 3, 4, 5])]
    #[case(6, 10, vec![4, 5, 6, 7, 8])]
    #[case(10, 10, vec![6, 7, 8, 9, 10])]
    #[case(9, 10, vec![6, 7, 8, 9, 10])]
    fn test_page_window(#[case] current: u32, #[case] pages: u64, #[case] expected: Vec<u32>) {
        let view = PaginationView::new(current, 10, pages * 10, "logs", true);
        assert_eq!(view.pages, expected);
    }

    #[test]
    fn test_pagination_summary() {
        let view = PaginationView::new(2, 200, 450, "logs", true);
        assert_eq!(view.summary, "Showing 201-400 of 450 logs");
        assert!(view.has_prev && view.has_next);

        let empty = PaginationView::new(1, 200, 0, "queries", true);
        assert_eq!(empty.summary, "No queries found");
        assert!(!empty.visible);

        assert!(!PaginationView::new(1, 200, 5, "logs", false).visible);
    }

    #[test]
    fn test_chart_segment_shares() {
        let buckets = vec![TimeBucket::new("2025-06-22 10:00:00", 10)
            .with("error", 3)
            .with("info", 7)];
        let chart = ChartView::new(&LOGS, Some(&buckets), 10);

        assert_eq!(chart.title, "10 Results");
        assert_eq!(chart.bars.len(), 1);
        let bar = &chart.bars[0];
        assert_eq!(bar.height_pct, 100.0);
        assert_eq!(bar.segments.len(), 2);
        assert_eq!(bar.segments[0].category, "error");
        assert!((bar.segments[0].share - 0.3).abs() < 1e-9);
        assert!((bar.segments[1].height_pct - 70.0).abs() < 1e-9);
        assert_eq!(bar.tooltip, vec!["10:00:00", "Total: 10", "Error: 3", "Info: 7"]);
    }

    #[test]
    fn test_chart_without_data() {
        assert!(ChartView::new(&QUERIES, None, 0).is_empty());
        assert!(ChartView::new(&QUERIES, Some(&[]), 0).is_empty());
    }

    #[test]
    fn test_stat_counters_for_queries() {
        let stats: Stats = serde_json::from_value(serde_json::json!({
            "total": 12, "success": 10, "error": 2, "avgDuration": 153.6
        }))
        .unwrap();
        let counters = stat_counters(&QUERIES, &stats);
        let values: Vec<_> = counters.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, vec!["12", "10", "2", "154 ms"]);
    }
}
