//! Record types returned by the log-history and query-history endpoints

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One row of `log_history`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogRecord {
    pub timestamp: Option<String>,
    pub log_level: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub query_id: Option<String>,
    pub message: Option<String>,
    /// Message extracted from the structured `fields` column, preferred over `message`
    pub fields_message: Option<String>,
    pub target: Option<String>,
    pub path: Option<String>,
    pub cluster_id: Option<String>,
    pub node_id: Option<String>,
    pub warehouse_id: Option<String>,
    /// Columns this client does not model
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LogRecord {
    /// Message shown to the user
    pub fn display_message(&self) -> &str {
        self.fields_message
            .as_deref()
            .filter(|m| !m.is_empty())
            .or(self.message.as_deref().filter(|m| !m.is_empty()))
            .unwrap_or("No message")
    }

    /// Lower-cased level used for badges and chart categories; `info` when absent
    pub fn level_category(&self) -> String {
        match self.log_level.as_deref().map(str::to_ascii_uppercase).as_deref() {
            Some("ERROR") => "error".to_string(),
            Some("WARN") | Some("WARNING") => "warning".to_string(),
            Some("DEBUG") | Some("TRACE") => "debug".to_string(),
            Some(other) if !other.is_empty() => other.to_ascii_lowercase(),
            _ => "info".to_string(),
        }
    }
}

/// One row of `query_history`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub query_id: Option<String>,
    pub query_text: Option<String>,
    pub query_kind: Option<String>,
    pub query_start_time: Option<String>,
    pub start_time: Option<String>,
    pub event_time: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub duration_ms: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub query_duration_ms: Option<f64>,
    pub sql_user: Option<String>,
    pub current_database: Option<String>,
    pub handler_type: Option<String>,
    pub log_type_name: Option<String>,
    #[serde(deserialize_with = "lenient_u64")]
    pub result_rows: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    pub result_bytes: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    pub scan_rows: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    pub scan_bytes: Option<u64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub exception_code: Option<i64>,
    pub exception_text: Option<String>,
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QueryRecord {
    /// First available of the start-time columns
    pub fn started_at(&self) -> Option<&str> {
        self.query_start_time
            .as_deref()
            .or(self.start_time.as_deref())
            .or(self.event_time.as_deref())
    }

    /// Duration in milliseconds from whichever column the backend filled
    pub fn duration(&self) -> Option<f64> {
        self.duration_ms.or(self.query_duration_ms)
    }

    /// `error` when the query raised a non-zero exception code, else `success`
    pub fn status_category(&self) -> &'static str {
        match self.exception_code {
            Some(code) if code != 0 => "error",
            _ => "success",
        }
    }

    pub fn sql(&self) -> &str {
        self.query_text
            .as_deref()
            .filter(|q| !q.is_empty())
            .unwrap_or("No query text")
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
