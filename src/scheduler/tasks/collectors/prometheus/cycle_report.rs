use serde::Serialize;
use uuid::Uuid;

use crate::core::client::prometheus_dto::QueryWindow;
use crate::domain::metric::heapster::node_metric_record::NodeMetricRecord;
use crate::domain::metric::heapster::pod_metric_record::PodMetricRecord;
use crate::domain::metric::heapster::schema::SCHEMA_VERSION;
use crate::errors::CollectorError;

/// Everything collected for one node in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeCollection {
    pub node: NodeMetricRecord,
    pub pods: Vec<PodMetricRecord>,
}

impl NodeCollection {
    pub fn name(&self) -> &str {
        self.node.name()
    }
}

/// A node whose range query failed. The rest of the cycle is unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeQueryFailure {
    pub node: String,
    pub query: String,
    pub window: QueryWindow,
    pub error: String,
    pub retryable: bool,
}

impl NodeQueryFailure {
    pub fn new(node: &str, query: &str, window: &QueryWindow, err: &CollectorError) -> Self {
        Self {
            node: node.to_string(),
            query: query.to_string(),
            window: *window,
            error: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

/// Output of one collection cycle, handed to the exporter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub schema_version: &'static str,
    pub window: QueryWindow,
    /// Sorted by node name.
    pub nodes: Vec<NodeCollection>,
    pub failures: Vec<NodeQueryFailure>,
    /// Distinct backend warnings seen during the cycle.
    pub warnings: Vec<String>,
}

impl CycleReport {
    pub fn new(cycle_id: Uuid, window: QueryWindow) -> Self {
        Self {
            cycle_id,
            schema_version: SCHEMA_VERSION,
            window,
            nodes: Vec::new(),
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn node(&self, name: &str) -> Option<&NodeCollection> {
        self.nodes.iter().find(|n| n.name() == name)
    }

    pub fn pod_count(&self) -> usize {
        self.nodes.iter().map(|n| n.pods.len()).sum()
    }

    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}
