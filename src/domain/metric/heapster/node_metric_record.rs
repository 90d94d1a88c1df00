use serde::{Deserialize, Serialize};

use super::metric_point::{FsMetricPoint, MetricPoint};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLabels {
    pub host_id: String,
    pub hostname: String,
    /// Node labels flattened as `key:value` pairs joined by commas.
    pub labels: String,
    pub nodename: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
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
    #[serde(rename = "filesystem/inodes")]
    pub filesystem_inodes: Vec<FsMetricPoint<i64>>,
    #[serde(rename = "filesystem/inodes_free")]
    pub filesystem_inodes_free: Vec<FsMetricPoint<i64>>,
}

impl NodeMetrics {
    pub fn is_empty(&self) -> bool {
        self.cpu_limit.is_empty()
            && self.cpu_usage.is_empty()
            && self.filesystem_limit.is_empty()
            && self.filesystem_usage.is_empty()
            && self.memory_cache.is_empty()
            && self.memory_limit.is_empty()
            && self.memory_rss.is_empty()
            && self.memory_usage.is_empty()
            && self.network_rx.is_empty()
            && self.network_tx.is_empty()
            && self.uptime.is_empty()
            && self.filesystem_inodes.is_empty()
            && self.filesystem_inodes_free.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetricRecord {
    pub labels: NodeLabels,
    pub metrics: NodeMetrics,
}

impl NodeMetricRecord {
    pub fn name(&self) -> &str {
        &self.labels.nodename
    }
}
