//! Collector configuration.
//!
//! Values come from `PROMCOLLECT_*` environment variables (a `.env` file is read first
//! when present) layered over [`CollectorConfig::default`].

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use backon::ExponentialBuilder;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use validator::{Validate, ValidationError};

use crate::errors::{CollectorError, Result};

const ENV_PREFIX: &str = "PROMCOLLECT_";

/// What the orchestrator does when a single node's query fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeFailurePolicy {
    /// Record the failure and keep collecting the remaining nodes.
    #[default]
    Isolate,
    /// Fail the whole cycle on the first node error.
    AbortCycle,
}

impl FromStr for NodeFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "isolate" => Ok(Self::Isolate),
            "abort_cycle" | "abort" => Ok(Self::AbortCycle),
            other => Err(format!("unknown node failure policy '{other}'")),
        }
    }
}

/// Retry schedule for node discovery on conflict errors.
/// Defaults match client-go's `retry.DefaultBackoff`.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct NodeRetryPolicy {
    /// Total number of attempts, including the first one.
    #[validate(range(min = 1, max = 20))]
    pub steps: usize,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub initial_delay: Duration,
    #[validate(range(min = 1.0, max = 10.0))]
    pub factor: f32,
    pub jitter: bool,
}

impl Default for NodeRetryPolicy {
    fn default() -> Self {
        Self {
            steps: 4,
            initial_delay: Duration::from_millis(10),
            factor: 5.0,
            jitter: true,
        }
    }
}

impl NodeRetryPolicy {
    pub fn backoff(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_factor(self.factor)
            .with_max_times(self.steps.saturating_sub(1));
        if self.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_window"))]
pub struct CollectorConfig {
    /// Base URL of the Prometheus-compatible backend.
    #[validate(url)]
    pub prometheus_url: String,
    /// How far back each range query reaches.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub lookback: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub step: Duration,
    /// Deadline applied to every single backend call.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub query_timeout: Duration,
    /// Wall-clock bound for one whole collection cycle.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub cycle_timeout: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub collection_interval: Duration,
    /// Pause after a backend client could not be built.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub connection_backoff: Duration,
    #[validate(nested)]
    pub node_retry: NodeRetryPolicy,
    #[validate(range(min = 1, max = 100))]
    pub probe_retry_count: u32,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub probe_retry_delay: Duration,
    #[validate(range(min = 1, max = 64))]
    pub max_concurrency: usize,
    pub failure_policy: NodeFailurePolicy,
    /// Directory that receives heapster-clone sample files. Logged only when unset.
    pub sample_dir: Option<PathBuf>,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            prometheus_url: "http://localhost:9090".into(),
            lookback: Duration::from_secs(3 * 60),
            step: Duration::from_secs(60),
            query_timeout: Duration::from_secs(10),
            cycle_timeout: Duration::from_secs(2 * 60),
            collection_interval: Duration::from_secs(60),
            connection_backoff: Duration::from_secs(2 * 60),
            node_retry: NodeRetryPolicy::default(),
            probe_retry_count: 10,
            probe_retry_delay: Duration::from_secs(1),
            max_concurrency: 4,
            failure_policy: NodeFailurePolicy::Isolate,
            sample_dir: None,
            log_level: "info".into(),
            log_dir: None,
        }
    }
}

fn validate_window(cfg: &CollectorConfig) -> std::result::Result<(), ValidationError> {
    if cfg.step.is_zero() {
        return Err(ValidationError::new("step_must_be_positive"));
    }
    if cfg.lookback < cfg.step {
        return Err(ValidationError::new("lookback_shorter_than_step"));
    }
    if cfg.query_timeout.is_zero() || cfg.cycle_timeout.is_zero() {
        return Err(ValidationError::new("timeouts_must_be_positive"));
    }
    Ok(())
}

impl CollectorConfig {
    /// Loads `.env` (if any), then the process environment.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(CollectorError::Config(format!("Failed to read .env: {e}")));
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Keys are the upper-case field
    /// names prefixed with `PROMCOLLECT_`; durations are given in seconds, except the
    /// `*_MS` keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut cfg = Self::default();

        if let Some(v) = get("PROMETHEUS_URL") {
            cfg.prometheus_url = v;
        }
        if let Some(v) = parse::<u64>(&get, "LOOKBACK_SECS")? {
            cfg.lookback = Duration::from_secs(v);
        }
        if let Some(v) = parse::<u64>(&get, "STEP_SECS")? {
            cfg.step = Duration::from_secs(v);
        }
        if let Some(v) = parse::<u64>(&get, "QUERY_TIMEOUT_SECS")? {
            cfg.query_timeout = Duration::from_secs(v);
        }
        if let Some(v) = parse::<u64>(&get, "CYCLE_TIMEOUT_SECS")? {
            cfg.cycle_timeout = Duration::from_secs(v);
        }
        if let Some(v) = parse::<u64>(&get, "COLLECTION_INTERVAL_SECS")? {
            cfg.collection_interval = Duration::from_secs(v);
        }
        if let Some(v) = parse::<u64>(&get, "CONNECTION_BACKOFF_SECS")? {
            cfg.connection_backoff = Duration::from_secs(v);
        }
        if let Some(v) = parse::<usize>(&get, "NODE_RETRY_STEPS")? {
            cfg.node_retry.steps = v;
        }
        if let Some(v) = parse::<u64>(&get, "NODE_RETRY_INITIAL_DELAY_MS")? {
            cfg.node_retry.initial_delay = Duration::from_millis(v);
        }
        if let Some(v) = parse::<f32>(&get, "NODE_RETRY_FACTOR")? {
            cfg.node_retry.factor = v;
        }
        if let Some(v) = parse::<bool>(&get, "NODE_RETRY_JITTER")? {
            cfg.node_retry.jitter = v;
        }
        if let Some(v) = parse::<u32>(&get, "PROBE_RETRY_COUNT")? {
            cfg.probe_retry_count = v;
        }
        if let Some(v) = parse::<u64>(&get, "PROBE_RETRY_DELAY_MS")? {
            cfg.probe_retry_delay = Duration::from_millis(v);
        }
        if let Some(v) = parse::<usize>(&get, "MAX_CONCURRENCY")? {
            cfg.max_concurrency = v;
        }
        if let Some(v) = parse::<NodeFailurePolicy>(&get, "FAILURE_POLICY")? {
            cfg.failure_policy = v;
        }
        if let Some(v) = get("SAMPLE_DIR") {
            cfg.sample_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("LOG_LEVEL") {
            cfg.log_level = v;
        }
        if let Some(v) = get("LOG_DIR") {
            cfg.log_dir = Some(PathBuf::from(v));
        }

        cfg.validated()
    }

    /// Runs the declarative checks and hands the config back.
    pub fn validated(self) -> Result<Self> {
        self.validate()
            .map_err(|e| CollectorError::Config(e.to_string()))?;
        Ok(self)
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(name)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| {
                CollectorError::Config(format!("{ENV_PREFIX}{name}='{raw}' is invalid: {e}"))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = CollectorConfig::default().validated().unwrap();
        assert_eq!(cfg.lookback, Duration::from_secs(180));
        assert_eq!(cfg.step, Duration::from_secs(60));
        assert_eq!(cfg.query_timeout, Duration::from_secs(10));
        assert_eq!(cfg.failure_policy, NodeFailurePolicy::Isolate);
    }

    #[test]
    fn lookup_overrides_defaults() {
        let cfg = CollectorConfig::from_lookup(lookup(&[
            ("PROMCOLLECT_PROMETHEUS_URL", "http://prometheus.monitoring:9090"),
            ("PROMCOLLECT_LOOKBACK_SECS", "600"),
            ("PROMCOLLECT_STEP_SECS", "30"),
            ("PROMCOLLECT_FAILURE_POLICY", "abort_cycle"),
            ("PROMCOLLECT_NODE_RETRY_STEPS", "6"),
            ("PROMCOLLECT_SAMPLE_DIR", "/tmp/samples"),
        ]))
        .unwrap();

        assert_eq!(cfg.prometheus_url, "http://prometheus.monitoring:9090");
        assert_eq!(cfg.lookback, Duration::from_secs(600));
        assert_eq!(cfg.step, Duration::from_secs(30));
        assert_eq!(cfg.failure_policy, NodeFailurePolicy::AbortCycle);
        assert_eq!(cfg.node_retry.steps, 6);
        assert_eq!(cfg.sample_dir, Some(PathBuf::from("/tmp/samples")));
    }

    #[test]
    fn malformed_number_is_a_config_error() {
        let err = CollectorConfig::from_lookup(lookup(&[("PROMCOLLECT_STEP_SECS", "one")]))
            .unwrap_err();
        assert!(matches!(err, CollectorError::Config(msg) if msg.contains("STEP_SECS")));
    }

    #[test]
    fn invalid_url_is_rejected() {
        let err = CollectorConfig::from_lookup(lookup(&[(
            "PROMCOLLECT_PROMETHEUS_URL",
            "not a url",
        )]))
        .unwrap_err();
        assert!(matches!(err, CollectorError::Config(_)));
    }

    #[test]
    fn lookback_must_cover_one_step() {
        let err = CollectorConfig::from_lookup(lookup(&[
            ("PROMCOLLECT_LOOKBACK_SECS", "30"),
            ("PROMCOLLECT_STEP_SECS", "60"),
        ]))
        .unwrap_err();
        assert!(matches!(err, CollectorError::Config(msg) if msg.contains("lookback_shorter_than_step")));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let err = CollectorConfig::from_lookup(lookup(&[("PROMCOLLECT_MAX_CONCURRENCY", "0")]))
            .unwrap_err();
        assert!(matches!(err, CollectorError::Config(_)));
    }

    #[test]
    fn config_round_trips_through_json_with_second_durations() {
        let json = serde_json::to_value(CollectorConfig::default()).unwrap();
        assert_eq!(json["lookback"], 180);
        assert_eq!(json["node_retry"]["initial_delay"], 10);
        assert_eq!(json["failure_policy"], "isolate");
    }
}
