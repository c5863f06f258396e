//! Text formatting shared by the record views

use chrono::{DateTime, Local, NaiveDateTime};

/// Thousands-separated integer (`1234567` -> `1,234,567`)
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Thousands-separated float rounded to a whole number
pub fn format_rounded(value: f64) -> String {
    format_number(value.max(0.0).round() as u64)
}

/// Human readable byte size with binary units and at most two decimals
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let exp = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exp as i32);
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[exp])
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// `HH:MM:SS`, or `YYYY-MM-DD HH:MM:SS.mmm` when `detailed`.
///
/// Zoned timestamps are shown in local time, naive ones as written. Missing
/// values render `N/A`; unparsable ones are returned untouched.
pub fn format_timestamp(raw: Option<&str>, detailed: bool) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return "N/A".to_string();
    };
    match parse_timestamp(raw) {
        Some(ts) if detailed => ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        Some(ts) => ts.format("%H:%M:%S").to_string(),
        None => raw.to_string(),
    }
}

/// Cut `text` to `limit` characters, appending `...` when something was dropped
pub fn truncate(text: &str, limit: usize) -> (String, bool) {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => (format!("{}...", &text[..idx]), true),
        None => (text.to_string(), false),
    }
}

/// Pretty-print JSON messages; otherwise turn escaped `\n` into real newlines
pub fn pretty_message(content: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(content) {
        Ok(value @ (serde_json::Value::Object(_) | serde_json::Value::Array(_))) => {
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| content.to_string())
        }
        _ => content.replace("\\n", "\n"),
    }
}

/// Collapse whitespace runs (including newlines) into single spaces
pub fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

const STATEMENT_TYPES: [&str; 10] = [
    "SELECT", "INSERT", "UPDATE", "DELETE", "CREATE", "DROP", "ALTER", "SHOW", "DESCRIBE",
    "EXPLAIN",
];

/// Leading SQL keyword, `QUERY` when unrecognized
pub fn statement_type(sql: &str) -> &'static str {
    let upper = sql.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return "UNKNOWN";
    }
    STATEMENT_TYPES
        .iter()
        .find(|t| upper.starts_with(*t))
        .copied()
        .unwrap_or("QUERY")
}

/// Latency tier of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Performance {
    Fast,
    Medium,
    Slow,
    VerySlow,
}

impl Performance {
    pub fn classify(duration_ms: f64) -> Self {
        if duration_ms < 100.0 {
            Self::Fast
        } else if duration_ms < 1000.0 {
            Self::Medium
        } else if duration_ms < 5000.0 {
            Self::Slow
        } else {
            Self::VerySlow
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Medium => "medium",
            Self::Slow => "slow",
            Self::VerySlow => "very slow",
        }
    }
}

/// Milliseconds without a trailing `.0`, thousands separated
pub fn format_millis(ms: f64) -> String {
    if ms.fract() == 0.0 {
        format_rounded(ms)
    } else {
        format!("{ms:.1}")
    }
}
