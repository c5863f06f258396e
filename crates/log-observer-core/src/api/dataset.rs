//! Generated log and query history served by the demo backend
//!
//! Rows are generated once with timestamps relative to the generation time.
//! At query time every timestamp is shifted by the elapsed wall time so the
//! data keeps "arriving" and short windows stay populated.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::models::{LogRecord, QueryRecord, QueryRequest};

use super::predicate::Predicate;

/// Oldest generated row, matching the longest selectable window
const HISTORY_HOURS: i64 = 48;
/// Default and maximum page sizes accepted by the record endpoints
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 200;
/// Bars in the time-distribution chart
const BUCKETS: i64 = 12;

const LOG_LEVELS: [(&str, u32); 4] = [("INFO", 70), ("DEBUG", 15), ("WARN", 10), ("ERROR", 5)];

const TARGETS: [&str; 6] = [
    "databend_query::servers::http::v1::query",
    "databend_query::interpreters::interpreter",
    "databend_query::sessions::session",
    "databend_common_storage::operator",
    "databend_query::pipelines::executor",
    "databend_meta::grpc",
];

const MESSAGES: [(&str, &str); 12] = [
    ("INFO", "query started"),
    ("INFO", "query finished, rows=1024, bytes=65536"),
    ("INFO", "session created for user 'root'"),
    ("INFO", "executor pipeline built with 8 processors"),
    ("INFO", r#"{"event":"flush","table":"sales","blocks":3}"#),
    ("DEBUG", "acquired table lock on default.sales"),
    ("DEBUG", "prune partitions: 12 -> 3"),
    ("WARN", "slow query detected, elapsed 6.2s"),
    ("WARN", "retrying storage request\\nattempt=2"),
    ("ERROR", "Code: 1025, Text = Unknown table 'orders'"),
    ("ERROR", "connection reset by peer"),
    ("ERROR", "memory limit exceeded while building hash table"),
];

const STATEMENTS: [(&str, &str); 8] = [
    ("Query", "SELECT count(*) FROM sales WHERE region = 'emea'"),
    ("Query", "SELECT user_id, sum(amount) FROM orders GROUP BY user_id ORDER BY 2 DESC LIMIT 10"),
    ("Query", "SELECT * FROM system_history.log_history WHERE log_level = 'ERROR'"),
    ("Insert", "INSERT INTO events SELECT * FROM staging_events"),
    ("Update", "UPDATE sales SET status = 'shipped' WHERE id = 42"),
    ("Delete", "DELETE FROM sessions WHERE expires_at < now()"),
    ("Other", "CREATE TABLE IF NOT EXISTS audit (id INT, payload VARIANT)"),
    ("Other", "SHOW TABLES"),
];

const USERS: [&str; 3] = ["root", "analyst", "etl"];
const DATABASES: [&str; 3] = ["default", "sales", "system_history"];
const FAILURES: [(i64, &str); 3] = [
    (1025, "Unknown table 'orders'"),
    (1005, "Syntax error near 'FORM'"),
    (1003, "Memory limit exceeded"),
];

/// A generated row and its age relative to generation time
#[derive(Debug, Clone)]
struct Row<R> {
    at: DateTime<Utc>,
    record: R,
}

/// In-memory tables behind the demo endpoints
#[derive(Debug, Clone)]
pub struct Dataset {
    generated_at: DateTime<Utc>,
    logs: Vec<Row<LogRecord>>,
    queries: Vec<Row<QueryRecord>>,
}

/// Age skewed toward recent rows so every window has data
fn random_age<R: Rng>(rng: &mut R) -> ChronoDuration {
    let u: f64 = rng.gen();
    let ms = (u.powi(3) * ChronoDuration::hours(HISTORY_HOURS).num_milliseconds() as f64) as i64;
    ChronoDuration::milliseconds(ms)
}

fn weighted_level<R: Rng>(rng: &mut R) -> &'static str {
    let total: u32 = LOG_LEVELS.iter().map(|(_, w)| w).sum();
    let mut pick = rng.gen_range(0..total);
    for (level, weight) in LOG_LEVELS {
        if pick < weight {
            return level;
        }
        pick -= weight;
    }
    "INFO"
}

impl Dataset {
    pub fn generate<R: Rng>(log_count: usize, query_count: usize, rng: &mut R) -> Self {
        let generated_at = Utc::now();

        let mut queries: Vec<Row<QueryRecord>> = (0..query_count)
            .map(|_| {
                let at = generated_at - random_age(rng);
                let (kind, sql) = STATEMENTS.choose(rng).copied().unwrap_or(STATEMENTS[0]);
                let failure = rng.gen_bool(0.1).then(|| FAILURES.choose(rng).copied()).flatten();
                let duration = (rng.gen::<f64>().powi(4) * 8000.0).round() + 1.0;
                let scan_rows = rng.gen_range(0..5_000_000u64);
                QueryRecord {
                    query_id: Some(Uuid::new_v4().to_string()),
                    query_text: Some(sql.to_string()),
                    query_kind: Some(kind.to_string()),
                    duration_ms: Some(duration),
                    sql_user: USERS.choose(rng).map(|s| (*s).to_string()),
                    current_database: DATABASES.choose(rng).map(|s| (*s).to_string()),
                    handler_type: Some("HTTPQuery".to_string()),
                    log_type_name: Some(if failure.is_some() { "Error" } else { "Finish" }.to_string()),
                    result_rows: Some(rng.gen_range(0..10_000)),
                    result_bytes: Some(rng.gen_range(0..50_000_000)),
                    scan_rows: Some(scan_rows),
                    scan_bytes: Some(scan_rows * 64),
                    exception_code: Some(failure.map_or(0, |(code, _)| code)),
                    exception_text: failure.map(|(_, text)| text.to_string()),
                    status: Some(if failure.is_some() { "error" } else { "success" }.to_string()),
                    ..Default::default()
                }
                .at(at)
            })
            .collect();
        queries.sort_by(|a, b| b.at.cmp(&a.at));

        let mut logs: Vec<Row<LogRecord>> = (0..log_count)
            .map(|_| {
                let level = weighted_level(rng);
                // most log lines belong to a query and are written during it
                let owner = queries.choose(rng).filter(|_| rng.gen_bool(0.7));
                let at = match owner {
                    Some(q) => q.at + ChronoDuration::milliseconds(rng.gen_range(0..500)),
                    None => generated_at - random_age(rng),
                }
                .min(generated_at);
                let message = MESSAGES
                    .iter()
                    .filter(|(l, _)| *l == level)
                    .collect::<Vec<_>>()
                    .choose(rng)
                    .map_or("heartbeat", |(_, m)| *m);
                LogRecord {
                    log_level: Some(level.to_string()),
                    query_id: owner.and_then(|q| q.record.query_id.clone()),
                    message: Some(message.to_string()),
                    target: TARGETS.choose(rng).map(|s| (*s).to_string()),
                    path: Some(format!("src/query/service/src/{}.rs:{}", level.to_lowercase(), rng.gen_range(10..900))),
                    cluster_id: Some("demo-cluster".to_string()),
                    node_id: Some(format!("node-{}", rng.gen_range(1..4))),
                    warehouse_id: Some("default".to_string()),
                    ..Default::default()
                }
                .at(at)
            })
            .collect();
        logs.sort_by(|a, b| b.at.cmp(&a.at));

        debug!(logs = logs.len(), queries = queries.len(), "Generated demo dataset");
        Self {
            generated_at,
            logs,
            queries,
        }
    }

    /// Body of `POST /api/logs`
    pub fn query_logs(&self, request: &QueryRequest, now: DateTime<Utc>) -> Value {
        let shift = now - self.generated_at;
        let since = now - time_window(request);
        let predicates = predicates(request);

        let in_window: Vec<(DateTime<Utc>, Value)> = self
            .logs
            .iter()
            .filter_map(|row| {
                let at = row.at + shift;
                if at < since {
                    return None;
                }
                let mut record = row.record.clone();
                record.timestamp = Some(at.to_rfc3339_opts(SecondsFormat::Millis, true));
                if let Some(id) = request.query_id.as_deref() {
                    if record.query_id.as_deref() != Some(id) {
                        return None;
                    }
                } else if let Some(search) = request.search.as_deref() {
                    if !record.message.as_deref().unwrap_or_default().contains(search) {
                        return None;
                    }
                }
                let value = serde_json::to_value(&record).ok()?;
                predicates.iter().all(|p| p.matches(&value)).then_some((at, value))
            })
            .collect();

        // stats ignore the level filter
        let mut stats = BTreeMap::from([("error", 0u64), ("warning", 0), ("info", 0), ("debug", 0)]);
        for (_, row) in &in_window {
            if let Some(key) = row.get("log_level").and_then(Value::as_str).and_then(log_category) {
                *stats.entry(key).or_default() += 1;
            }
        }
        let stats_total: u64 = stats.values().sum();

        let level = request.level.as_deref().and_then(db_log_level);
        let filtered: Vec<(DateTime<Utc>, Value)> = in_window
            .into_iter()
            .filter(|(_, row)| match level {
                Some(level) => row.get("log_level").and_then(Value::as_str) == Some(level),
                None => true,
            })
            .collect();

        let distribution = distribution(&filtered, since, now, |row| {
            row.get("log_level").and_then(Value::as_str).and_then(log_category)
        });
        let mut stats_json: Map<String, Value> = stats.into_iter().map(|(k, v)| (k.to_string(), json!(v))).collect();
        stats_json.insert("total".to_string(), json!(stats_total));

        page_body("logs", request, filtered, Value::Object(stats_json), distribution)
    }

    /// Body of `POST /api/queries`
    pub fn query_queries(&self, request: &QueryRequest, now: DateTime<Utc>) -> Value {
        let shift = now - self.generated_at;
        let since = now - time_window(request);
        let predicates = predicates(request);

        let in_window: Vec<(DateTime<Utc>, Value)> = self
            .queries
            .iter()
            .filter_map(|row| {
                let at = row.at + shift;
                if at < since {
                    return None;
                }
                let mut record = row.record.clone();
                let stamp = at.to_rfc3339_opts(SecondsFormat::Millis, true);
                record.query_start_time = Some(stamp.clone());
                record.event_time = Some(stamp);
                if let Some(id) = request.query_id.as_deref() {
                    if record.query_id.as_deref() != Some(id) {
                        return None;
                    }
                } else if let Some(search) = request.search.as_deref() {
                    if !record.query_text.as_deref().unwrap_or_default().contains(search) {
                        return None;
                    }
                }
                let value = serde_json::to_value(&record).ok()?;
                predicates.iter().all(|p| p.matches(&value)).then_some((at, value))
            })
            .collect();

        let status_of = |row: &Value| match row.get("exception_code").and_then(Value::as_i64) {
            Some(code) if code != 0 => "error",
            _ => "success",
        };

        let errors = in_window.iter().filter(|(_, r)| status_of(r) == "error").count() as u64;
        let total = in_window.len() as u64;
        let avg_duration = if in_window.is_empty() {
            0.0
        } else {
            in_window
                .iter()
                .filter_map(|(_, r)| r.get("duration_ms").and_then(Value::as_f64))
                .sum::<f64>()
                / in_window.len() as f64
        };
        let stats = json!({
            "total": total,
            "success": total - errors,
            "error": errors,
            "avgDuration": (avg_duration * 10.0).round() / 10.0,
        });

        let status = request.status.as_deref().filter(|s| *s == "success" || *s == "error");
        let filtered: Vec<(DateTime<Utc>, Value)> = in_window
            .into_iter()
            .filter(|(_, row)| status.map_or(true, |s| status_of(row) == s))
            .collect();

        let distribution = distribution(&filtered, since, now, |row| Some(status_of(row)));
        page_body("queries", request, filtered, stats, distribution)
    }
}

trait AtTime: Sized {
    fn at(self, at: DateTime<Utc>) -> Row<Self> {
        Row { at, record: self }
    }
}

impl AtTime for LogRecord {}
impl AtTime for QueryRecord {}

fn time_window(request: &QueryRequest) -> ChronoDuration {
    ChronoDuration::from_std(request.time_range.duration())
        .unwrap_or_else(|_| ChronoDuration::hours(HISTORY_HOURS))
}

fn predicates(request: &QueryRequest) -> Vec<Predicate> {
    request
        .filters
        .iter()
        .filter_map(|text| {
            let parsed = Predicate::parse(text);
            if parsed.is_none() {
                debug!(condition = %text, "Ignoring unparsable filter");
            }
            parsed
        })
        .collect()
}

/// `warning` -> `WARN` and friends; unknown levels are ignored
fn db_log_level(level: &str) -> Option<&'static str> {
    match level {
        "warning" => Some("WARN"),
        "error" => Some("ERROR"),
        "info" => Some("INFO"),
        "debug" => Some("DEBUG"),
        _ => None,
    }
}

fn log_category(level: &str) -> Option<&'static str> {
    match level {
        "ERROR" => Some("error"),
        "WARN" => Some("warning"),
        "INFO" => Some("info"),
        "DEBUG" => Some("debug"),
        _ => None,
    }
}

fn distribution<F>(rows: &[(DateTime<Utc>, Value)], since: DateTime<Utc>, now: DateTime<Utc>, category: F) -> Value
where
    F: Fn(&Value) -> Option<&'static str>,
{
    let width = (now - since) / BUCKETS as i32;
    let width_ms = width.num_milliseconds().max(1);

    let mut buckets: Vec<BTreeMap<&'static str, u64>> = vec![BTreeMap::new(); BUCKETS as usize];
    for (at, row) in rows {
        let idx = ((*at - since).num_milliseconds() / width_ms).clamp(0, BUCKETS - 1) as usize;
        let counts = &mut buckets[idx];
        *counts.entry("total").or_default() += 1;
        if let Some(cat) = category(row) {
            *counts.entry(cat).or_default() += 1;
        }
    }

    if rows.is_empty() {
        return json!([]);
    }

    Value::Array(
        buckets
            .into_iter()
            .enumerate()
            .map(|(i, counts)| {
                let start = since + width * i as i32;
                let mut bucket = Map::new();
                bucket.insert(
                    "time_bucket".to_string(),
                    json!(start.to_rfc3339_opts(SecondsFormat::Secs, true)),
                );
                bucket.insert("total".to_string(), json!(0));
                for (k, v) in counts {
                    bucket.insert(k.to_string(), json!(v));
                }
                Value::Object(bucket)
            })
            .collect(),
    )
}

fn page_body(
    data_key: &str,
    request: &QueryRequest,
    rows: Vec<(DateTime<Utc>, Value)>,
    stats: Value,
    time_distribution: Value,
) -> Value {
    let page_size = match request.page_size {
        0 => DEFAULT_PAGE_SIZE,
        n => n.min(MAX_PAGE_SIZE),
    };
    let page = request.page.max(1);
    let total = rows.len();
    let offset = (page as usize - 1) * page_size as usize;
    let records: Vec<Value> = rows
        .into_iter()
        .skip(offset)
        .take(page_size as usize)
        .map(|(_, row)| row)
        .collect();

    let mut body = json!({
        "total": total,
        "page": page,
        "pageSize": page_size,
        "totalPages": total.div_ceil(page_size as usize),
        "stats": stats,
        "timeDistribution": time_distribution,
    });
    body[data_key] = Value::Array(records);
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeRange;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn dataset() -> Dataset {
        let mut rng = StdRng::seed_from_u64(7);
        Dataset::generate(500, 100, &mut rng)
    }

    fn request() -> QueryRequest {
        QueryRequest {
            page: 1,
            page_size: 20,
            time_range: TimeRange::TwoDays,
            level: None,
            status: None,
            search: None,
            query_id: None,
            filters: vec![],
        }
    }

    #[test]
    fn test_logs_page_shape() {
        let data = dataset();
        let body = data.query_logs(&request(), data.generated_at);

        assert_eq!(body["total"], 500);
        assert_eq!(body["logs"].as_array().unwrap().len(), 20);
        assert_eq!(body["totalPages"], 25);
        let stats = &body["stats"];
        let sum: u64 = ["error", "warning", "info", "debug"]
            .iter()
            .map(|k| stats[k].as_u64().unwrap())
            .sum();
        assert_eq!(stats["total"].as_u64().unwrap(), sum);
    }

    #[test]
    fn test_logs_newest_first() {
        let data = dataset();
        let body = data.query_logs(&request(), data.generated_at);
        let stamps: Vec<&str> = body["logs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["timestamp"].as_str().unwrap())
            .collect();
        let mut sorted = stamps.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(stamps, sorted);
    }

    #[test]
    fn test_level_filter_keeps_unfiltered_stats() {
        let data = dataset();
        let all = data.query_logs(&request(), data.generated_at);
        let mut errors_only = request();
        errors_only.level = Some("error".to_string());
        let body = data.query_logs(&errors_only, data.generated_at);

        assert_eq!(body["stats"], all["stats"]);
        assert_eq!(body["total"], all["stats"]["error"]);
        assert!(body["logs"]
            .as_array()
            .unwrap()
            .iter()
            .all(|l| l["log_level"] == "ERROR"));
    }

    #[test]
    fn test_query_id_takes_precedence_over_search() {
        let data = dataset();
        let id = data
            .logs
            .iter()
            .find_map(|r| r.record.query_id.clone())
            .expect("some logs belong to queries");
        let mut req = request();
        req.query_id = Some(id.clone());
        req.search = Some("no log says this".to_string());

        let body = data.query_logs(&req, data.generated_at);
        assert!(body["total"].as_u64().unwrap() > 0);
        assert!(body["logs"].as_array().unwrap().iter().all(|l| l["query_id"] == id.as_str()));
    }

    #[test]
    fn test_page_size_is_capped() {
        let data = dataset();
        let mut req = request();
        req.page_size = 1000;
        let body = data.query_logs(&req, data.generated_at);
        assert_eq!(body["pageSize"], MAX_PAGE_SIZE);
        assert_eq!(body["logs"].as_array().unwrap().len(), MAX_PAGE_SIZE as usize);
    }

    #[test]
    fn test_queries_status_filter_and_stats() {
        let data = dataset();
        let mut req = request();
        req.status = Some("error".to_string());
        let body = data.query_queries(&req, data.generated_at);

        assert_eq!(body["stats"]["total"], 100);
        assert_eq!(body["total"], body["stats"]["error"]);
        assert!(body["queries"]
            .as_array()
            .unwrap()
            .iter()
            .all(|q| q["exception_code"].as_i64() != Some(0)));
    }

    #[test]
    fn test_structured_filters_apply() {
        let data = dataset();
        let mut req = request();
        req.filters = vec!["sql_user = 'etl'".to_string()];
        let body = data.query_queries(&req, data.generated_at);
        assert!(body["queries"]
            .as_array()
            .unwrap()
            .iter()
            .all(|q| q["sql_user"] == "etl"));
    }

    #[test]
    fn test_distribution_buckets_sum_to_total() {
        let data = dataset();
        let body = data.query_logs(&request(), data.generated_at);
        let buckets = body["timeDistribution"].as_array().unwrap();
        assert_eq!(buckets.len(), BUCKETS as usize);
        let sum: u64 = buckets.iter().map(|b| b["total"].as_u64().unwrap()).sum();
        assert_eq!(sum, 500);
    }
}
