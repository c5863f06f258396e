//! Response-side types: one page of records plus its aggregates

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Per-category counters returned alongside a page (`error`, `info`, `avgDuration`, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stats(pub BTreeMap<String, f64>);

impl Stats {
    /// Raw value for a counter
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    /// Counter as a whole number, zero when absent
    pub fn count(&self, key: &str) -> u64 {
        self.get(key).map(|v| v.max(0.0).round() as u64).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Keep only numeric members of a JSON object
    fn from_value(value: Option<&Value>) -> Self {
        let Some(Value::Object(map)) = value else {
            return Self::default();
        };
        Self(
            map.iter()
                .filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n)))
                .collect(),
        )
    }
}

/// One aggregation window of the time-distribution chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBucket {
    pub time_bucket: String,
    #[serde(default)]
    pub total: u64,
    /// Per-category sub-counts (`error`, `warning`, `success`, ...)
    #[serde(flatten)]
    pub counts: BTreeMap<String, Value>,
}

impl TimeBucket {
    pub fn new(time_bucket: impl Into<String>, total: u64) -> Self {
        Self {
            time_bucket: time_bucket.into(),
            total,
            counts: BTreeMap::new(),
        }
    }

    /// Builder-style category count
    pub fn with(mut self, category: &str, count: u64) -> Self {
        self.counts.insert(category.to_string(), Value::from(count));
        self
    }

    /// Count for one category, zero when absent or non-numeric
    pub fn count(&self, category: &str) -> u64 {
        self.counts.get(category).and_then(Value::as_u64).unwrap_or(0)
    }
}

/// A normalized response of the record endpoints
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPage<R> {
    pub records: Vec<R>,
    pub total: u64,
    pub stats: Stats,
    /// `None` when the payload carried no distribution at all
    pub time_distribution: Option<Vec<TimeBucket>>,
}

impl<R> Default for RecordPage<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            total: 0,
            stats: Stats::default(),
            time_distribution: None,
        }
    }
}

impl<R: DeserializeOwned> RecordPage<R> {
    /// Normalize a raw JSON body, reading records from `data_key`.
    ///
    /// A truthy `error` member turns the whole payload into an error even on 2xx.
    pub fn from_response(body: Value, data_key: &str) -> Result<Self> {
        match body.get("error") {
            None | Some(Value::Null) => {}
            Some(Value::String(msg)) if msg.is_empty() => {}
            Some(Value::String(msg)) => return Err(Error::api(msg.clone())),
            Some(other) => return Err(Error::api(other.to_string())),
        }

        let records = match body.get(data_key) {
            Some(Value::Array(items)) => items
                .iter()
                .cloned()
                .map(serde_json::from_value)
                .collect::<std::result::Result<Vec<R>, _>>()?,
            _ => Vec::new(),
        };

        let total = body.get("total").and_then(Value::as_u64).unwrap_or(0);
        let stats = Stats::from_value(body.get("stats"));
        let time_distribution = match body.get("timeDistribution") {
            Some(Value::Array(_)) => Some(serde_json::from_value(body["timeDistribution"].clone())?),
            _ => None,
        };

        Ok(Self {
            records,
            total,
            stats,
            time_distribution,
        })
    }
}
