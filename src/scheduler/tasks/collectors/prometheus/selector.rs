use crate::domain::metric::heapster::schema::{NODE_FIELDS, NODE_INFO_METRIC, POD_FIELDS};

/// Metric names the legacy agent queried.
pub const LEGACY_METRICS: &[&str] = &[
    "kube_node_info",
    "kube_node_status_capacity_memory_bytes",
    "kube_node_status_capacity_cpu_cores",
    "container_cpu_usage_seconds_total",
    "container_memory_rss",
    "container_spec_memory_limit_bytes",
    "container_network_receive_bytes_total",
    "container_network_transmit_bytes_total",
    "container_last_seen",
];

/// Enumerated metric-name set turned into a single `__name__` regex selector.
/// Built once per cycle and shared by every node query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSelector {
    names: Vec<&'static str>,
}

impl Default for MetricSelector {
    /// Legacy names first, followed by every other name the field tables bind.
    fn default() -> Self {
        let mut names: Vec<&'static str> = LEGACY_METRICS.to_vec();
        let bound = NODE_FIELDS
            .iter()
            .chain(POD_FIELDS.iter())
            .map(|b| b.metric)
            .chain(std::iter::once(NODE_INFO_METRIC));
        for name in bound {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Self { names }
    }
}

impl MetricSelector {
    pub fn legacy() -> Self {
        Self {
            names: LEGACY_METRICS.to_vec(),
        }
    }

    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    pub fn expression(&self) -> String {
        format!("{{__name__=~\"{}\"}}", self.names.join("|"))
    }
}
