use anyhow::Result;
use tracing::info;

use crate::scheduler::tasks::collectors::prometheus::cycle_report::CycleReport;

/// Destination for a finished collection cycle.
pub trait MetricExporter: Send + Sync {
    fn export(&self, report: &CycleReport) -> Result<()>;
}

/// Used when no sample directory is configured: only a per-node summary is logged.
#[derive(Debug, Default)]
pub struct LoggingExporter;

impl MetricExporter for LoggingExporter {
    fn export(&self, report: &CycleReport) -> Result<()> {
        for collection in &report.nodes {
            info!(
                cycle_id = %report.cycle_id,
                node = collection.name(),
                pods = collection.pods.len(),
                "Collected node metrics"
            );
        }
        for warning in &report.warnings {
            info!(cycle_id = %report.cycle_id, "Backend warning: {}", warning);
        }
        Ok(())
    }
}
