use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::core::client::prometheus_dto::QueryWindow;
use crate::core::persistence::samples::metric_exporter_trait::MetricExporter;
use crate::core::persistence::samples::path::{
    sample_cycle_dir_path, sample_cycle_file_path, sample_node_file_path, sample_pods_file_path,
};
use crate::scheduler::tasks::collectors::prometheus::cycle_report::{CycleReport, NodeQueryFailure};

/// Writes each cycle into `<root>/cycle-<id>/` as heapster-clone JSON:
/// `node_<name>.json`, `pods_<name>.json` and a `cycle.json` summary.
#[derive(Debug, Clone)]
pub struct SampleDirFsAdapter {
    root: PathBuf,
}

#[derive(Serialize)]
struct CycleSummary<'a> {
    cycle_id: String,
    schema_version: &'a str,
    window: &'a QueryWindow,
    nodes: Vec<&'a str>,
    failures: &'a [NodeQueryFailure],
    warnings: &'a [String],
}

impl SampleDirFsAdapter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Failed to create {path:?}"))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

impl MetricExporter for SampleDirFsAdapter {
    fn export(&self, report: &CycleReport) -> Result<()> {
        let dir = sample_cycle_dir_path(&self.root, report.cycle_id);
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {dir:?}"))?;

        for collection in &report.nodes {
            Self::write_json(&sample_node_file_path(&dir, collection.name()), &collection.node)?;
            Self::write_json(&sample_pods_file_path(&dir, collection.name()), &collection.pods)?;
        }

        let summary = CycleSummary {
            cycle_id: report.cycle_id.to_string(),
            schema_version: report.schema_version,
            window: &report.window,
            nodes: report.nodes.iter().map(|n| n.name()).collect(),
            failures: &report.failures,
            warnings: &report.warnings,
        };
        Self::write_json(&sample_cycle_file_path(&dir), &summary)?;

        debug!(?dir, nodes = report.nodes.len(), "Wrote sample files");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cluster::cluster_node::ClusterNode;
    use crate::errors::CollectorError;
    use crate::scheduler::tasks::collectors::prometheus::cycle_report::NodeCollection;
    use crate::scheduler::tasks::collectors::prometheus::mappers::map_collection;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;
    use uuid::Uuid;

    fn report() -> CycleReport {
        let end = Utc.with_ymd_and_hms(2024, 5, 1, 12, 3, 0).unwrap();
        let window = QueryWindow::ending_at(end, Duration::from_secs(180), Duration::from_secs(60)).unwrap();
        let mut report = CycleReport::new(Uuid::new_v4(), window);
        let node = ClusterNode::new("node-a").with_provider_id("aws:///i-1");
        let collection: NodeCollection = map_collection(&node, &window, &[]);
        report.nodes.push(collection);
        report.failures.push(NodeQueryFailure::new(
            "node-b",
            "up",
            &window,
            &CollectorError::Transport {
                query: "up".into(),
                reason: "reset".into(),
            },
        ));
        report.warnings.push("PromQL info: metric might not be a counter".into());
        report
    }

    #[test]
    fn writes_node_pods_and_summary_files() {
        let root = std::env::temp_dir().join(format!("samples-{}", Uuid::new_v4()));
        let adapter = SampleDirFsAdapter::new(&root);
        let report = report();

        adapter.export(&report).unwrap();

        let dir = sample_cycle_dir_path(&root, report.cycle_id);
        let node: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.join("node_node-a.json")).unwrap()).unwrap();
        assert_eq!(node["labels"]["nodename"], "node-a");
        assert_eq!(node["labels"]["host_id"], "aws:///i-1");

        let pods: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.join("pods_node-a.json")).unwrap()).unwrap();
        assert_eq!(pods, serde_json::json!([]));

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.join("cycle.json")).unwrap()).unwrap();
        assert_eq!(summary["schema_version"], "heapster-clone/v1");
        assert_eq!(summary["nodes"], serde_json::json!(["node-a"]));
        assert_eq!(summary["failures"][0]["node"], "node-b");
        assert_eq!(summary["failures"][0]["retryable"], true);
        assert_eq!(summary["window"]["step"], 60);

        fs::remove_dir_all(&root).unwrap();
    }
}
