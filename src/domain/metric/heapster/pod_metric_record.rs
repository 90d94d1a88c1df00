use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::metric_point::{FsMetricPoint, MetricPoint};

/// Labels of one container within a pod.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodLabels {
    pub container_name: String,
    pub host_id: String,
    pub hostname: String,
    pub labels: BTreeMap<String, String>,
    pub namespace_id: String,
    pub nodename: String,
    pub pod_id: String,
    pub pod_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodMetrics {
    #[serde(rename = "cpu/limit")]
    pub cpu_limit: Vec<MetricPoint<String>>,
    #[serde(rename = "cpu/usage")]
    pub cpu_usage: Vec<MetricPoint<i64>>,
    #[serde(rename = "filesystem/limit")]
    pub filesystem_limit: Vec<FsMetricPoint<i64>>,
    #[serde(rename = "filesystem/usage")]
    pub filesystem_usage: Vec<FsMetricPoint<i64>>,
    #[serde(rename = "memory/cache")]
    pub memory_cache: Vec<MetricPoint<i64>>,
    #[serde(rename = "memory/limit")]
    pub memory_limit: Vec<MetricPoint<String>>,
    #[serde(rename = "memory/rss")]
    pub memory_rss: Vec<MetricPoint<i64>>,
    #[serde(rename = "memory/usage")]
    pub memory_usage: Vec<MetricPoint<u64>>,
    #[serde(rename = "network/rx")]
    pub network_rx: Vec<MetricPoint<u64>>,
    #[serde(rename = "network/tx")]
    pub network_tx: Vec<MetricPoint<u64>>,
    pub uptime: Vec<MetricPoint<i64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodMetricRecord {
    pub labels: PodLabels,
    pub metrics: PodMetrics,
}

impl PodMetricRecord {
    pub fn name(&self) -> &str {
        &self.labels.pod_name
    }
}
