//! Request-side types sent to the record endpoints

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The two record streams the backend serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Logs,
    Queries,
}

impl StreamKind {
    pub const ALL: [StreamKind; 2] = [Self::Logs, Self::Queries];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Logs => "logs",
            Self::Queries => "queries",
        }
    }

    /// Backend table the stream is read from
    pub fn table_name(self) -> &'static str {
        match self {
            Self::Logs => "log_history",
            Self::Queries => "query_history",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "logs" | "log_history" => Ok(Self::Logs),
            "queries" | "query_history" => Ok(Self::Queries),
            other => Err(crate::Error::validation(format!("unknown record stream '{other}'"))),
        }
    }
}

/// Relative time window ending now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TimeRange {
    #[serde(rename = "5m")]
    #[default]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "3h")]
    ThreeHours,
    #[serde(rename = "6h")]
    SixHours,
    #[serde(rename = "12h")]
    TwelveHours,
    #[serde(rename = "24h")]
    TwentyFourHours,
    #[serde(rename = "2d")]
    TwoDays,
}

impl TimeRange {
    /// Every selectable window, shortest first
    pub const ALL: [TimeRange; 9] = [
        Self::FiveMinutes,
        Self::FifteenMinutes,
        Self::ThirtyMinutes,
        Self::OneHour,
        Self::ThreeHours,
        Self::SixHours,
        Self::TwelveHours,
        Self::TwentyFourHours,
        Self::TwoDays,
    ];

    /// Wire representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::ThirtyMinutes => "30m",
            Self::OneHour => "1h",
            Self::ThreeHours => "3h",
            Self::SixHours => "6h",
            Self::TwelveHours => "12h",
            Self::TwentyFourHours => "24h",
            Self::TwoDays => "2d",
        }
    }

    /// Length of the window
    pub fn duration(self) -> Duration {
        let minutes = match self {
            Self::FiveMinutes => 5,
            Self::FifteenMinutes => 15,
            Self::ThirtyMinutes => 30,
            Self::OneHour => 60,
            Self::ThreeHours => 3 * 60,
            Self::SixHours => 6 * 60,
            Self::TwelveHours => 12 * 60,
            Self::TwentyFourHours => 24 * 60,
            Self::TwoDays => 48 * 60,
        };
        Duration::from_secs(minutes * 60)
    }

    /// Next longer window, wrapping around
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|r| *r == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Next shorter window, wrapping around
    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|r| *r == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| crate::Error::validation(format!("unknown time range '{s}'")))
    }
}

/// Auto-refresh setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoRefresh {
    #[default]
    Off,
    Every(Duration),
}

impl AutoRefresh {
    /// Choices offered by the selector
    pub const CHOICES: [AutoRefresh; 5] = [
        Self::Off,
        Self::Every(Duration::from_secs(5)),
        Self::Every(Duration::from_secs(10)),
        Self::Every(Duration::from_secs(30)),
        Self::Every(Duration::from_secs(60)),
    ];

    /// Refresh every `secs` seconds; zero means off
    pub fn seconds(secs: u64) -> Self {
        if secs == 0 {
            Self::Off
        } else {
            Self::Every(Duration::from_secs(secs))
        }
    }

    /// Next selector choice, wrapping around
    pub fn next(self) -> Self {
        let idx = Self::CHOICES.iter().position(|c| *c == self);
        match idx {
            Some(i) => Self::CHOICES[(i + 1) % Self::CHOICES.len()],
            None => Self::Off,
        }
    }
}

impl fmt::Display for AutoRefresh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => f.write_str("off"),
            Self::Every(period) => write!(f, "{}s", period.as_secs()),
        }
    }
}

impl FromStr for AutoRefresh {
    type Err = crate::Error;

    /// Accepts `off`, a bare number of seconds, or a humantime duration (`30s`, `1m`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("off") {
            return Ok(Self::Off);
        }
        if let Ok(secs) = s.parse::<u64>() {
            return Ok(Self::seconds(secs));
        }
        humantime::parse_duration(s)
            .map(|d| Self::seconds(d.as_secs()))
            .map_err(|e| crate::Error::validation(format!("invalid auto-refresh '{s}': {e}")))
    }
}

/// Body of `POST /api/logs` and `POST /api/queries`.
///
/// Built fresh from controller state for every fetch. `level` and `status` are
/// the same filter under the per-stream key; at most one is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub page: u32,
    pub page_size: u32,
    pub time_range: TimeRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,
}

impl QueryRequest {
    /// Zero-based offset of the first record on the requested page
    pub fn offset(&self) -> usize {
        (self.page.max(1) as usize - 1) * self.page_size as usize
    }

    /// The level/status constraint regardless of which key carries it
    pub fn category_filter(&self) -> Option<&str> {
        self.level.as_deref().or(self.status.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_time_range_round_trips_through_str() {
        for range in TimeRange::ALL {
            assert_eq!(range.as_str().parse::<TimeRange>().unwrap(), range);
        }
        assert!("7m".parse::<TimeRange>().is_err());
    }

    #[test]
    fn test_time_range_cycle() {
        assert_eq!(TimeRange::FiveMinutes.next(), TimeRange::FifteenMinutes);
        assert_eq!(TimeRange::TwoDays.next(), TimeRange::FiveMinutes);
        assert_eq!(TimeRange::FiveMinutes.prev(), TimeRange::TwoDays);
    }

    #[test]
    fn test_auto_refresh_parse() {
        assert_eq!("off".parse::<AutoRefresh>().unwrap(), AutoRefresh::Off);
        assert_eq!(
            "30".parse::<AutoRefresh>().unwrap(),
            AutoRefresh::Every(Duration::from_secs(30))
        );
        assert_eq!(
            "1m".parse::<AutoRefresh>().unwrap(),
            AutoRefresh::Every(Duration::from_secs(60))
        );
        assert_eq!("0".parse::<AutoRefresh>().unwrap(), AutoRefresh::Off);
        assert!("soon".parse::<AutoRefresh>().is_err());
    }

    #[test]
    fn test_request_omits_unset_fields() {
        let request = QueryRequest {
            page: 2,
            page_size: 200,
            time_range: TimeRange::OneHour,
            level: None,
            status: None,
            search: None,
            query_id: Some("42".to_string()),
            filters: vec![],
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"page": 2, "pageSize": 200, "timeRange": "1h", "queryId": "42"})
        );
        assert_eq!(request.offset(), 200);
    }
}
