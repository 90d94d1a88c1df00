/* Prometheus HTTP API v1 wire types */

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};

use crate::errors::{CollectorError, Result};

/// Label name → value for one series. Ordered so that grouping and output are stable.
pub type LabelSet = BTreeMap<String, String>;

pub const METRIC_NAME_LABEL: &str = "__name__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    Success,
    Error,
}

/// Envelope shared by every `/api/v1/*` endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status: ApiStatus,
    pub data: Option<T>,
    pub error_type: Option<String>,
    pub error: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
pub enum QueryData {
    Matrix(Vec<RangeSeries>),
    Vector(Vec<InstantSample>),
    Scalar(SamplePair),
    String(SamplePair),
}

impl QueryData {
    pub fn result_type(&self) -> &'static str {
        match self {
            QueryData::Matrix(_) => "matrix",
            QueryData::Vector(_) => "vector",
            QueryData::Scalar(_) => "scalar",
            QueryData::String(_) => "string",
        }
    }
}

/// `[<unix seconds>, "<value>"]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePair(pub f64, pub String);

impl SamplePair {
    /// Sample timestamp at millisecond precision (the backend's native resolution).
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        if !self.0.is_finite() {
            return None;
        }
        DateTime::from_timestamp_millis((self.0 * 1000.0).round() as i64)
    }

    pub fn value(&self) -> &str {
        &self.1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSeries {
    pub metric: LabelSet,
    #[serde(default)]
    pub values: Vec<SamplePair>,
}

impl RangeSeries {
    pub fn name(&self) -> Option<&str> {
        self.label(METRIC_NAME_LABEL)
    }

    /// Label value, treating empty strings as absent.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.metric
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstantSample {
    pub metric: LabelSet,
    pub value: SamplePair,
}

/// Decoded payload plus whatever caveats the backend attached to it.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    pub data: T,
    pub warnings: Vec<String>,
}

/// Sampling window of one range query.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub step: Duration,
}

impl QueryWindow {
    /// Window `[end - lookback, end]` sampled every `step`.
    pub fn ending_at(end: DateTime<Utc>, lookback: Duration, step: Duration) -> Result<Self> {
        let lookback = TimeDelta::from_std(lookback)
            .map_err(|e| CollectorError::Config(format!("lookback out of range: {e}")))?;
        if step.is_zero() {
            return Err(CollectorError::Config("step must be positive".into()));
        }
        Ok(Self {
            start: end - lookback,
            end,
            step,
        })
    }

    pub fn lookback(&self) -> TimeDelta {
        self.end - self.start
    }

    pub fn step_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.step).unwrap_or(TimeDelta::MAX)
    }

    /// Query parameters in the form `/api/v1/query_range` expects.
    pub fn as_params(&self) -> [(&'static str, String); 3] {
        [
            ("start", format_timestamp(self.start)),
            ("end", format_timestamp(self.end)),
            ("step", format_step(self.step)),
        ]
    }
}

impl fmt::Display for QueryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}] step {}s",
            format_timestamp(self.start),
            format_timestamp(self.end),
            format_step(self.step)
        )
    }
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn format_step(step: Duration) -> String {
    let secs = step.as_secs_f64();
    if secs.fract() == 0.0 {
        format!("{}", step.as_secs())
    } else {
        format!("{secs}")
    }
}
