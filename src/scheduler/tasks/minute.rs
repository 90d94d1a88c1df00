use chrono::Utc;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::CollectorConfig;
use crate::core::client::nodes::NodeSource;
use crate::core::client::prometheus_client::PrometheusClient;
use crate::core::persistence::samples::metric_exporter_trait::MetricExporter;
use crate::errors::{CollectorError, Result};
use crate::scheduler::tasks::collectors::prometheus::cycle_report::CycleReport;
use crate::scheduler::tasks::collectors::prometheus::task::CollectionOrchestrator;

/// One scheduled tick: bind a backend client, run a cycle, hand the report to the exporter.
pub async fn run<S>(
    config: &CollectorConfig,
    node_source: &S,
    transport: &Client,
    exporter: &dyn MetricExporter,
    cancel: &CancellationToken,
) -> Result<CycleReport>
where
    S: NodeSource + Clone,
{
    let now = Utc::now();
    debug!("Running collection task...");

    let querier = PrometheusClient::connect(&config.prometheus_url, transport.clone(), config.query_timeout)?;
    let orchestrator = CollectionOrchestrator::new(node_source.clone(), querier, config.clone());
    let report = orchestrator.run_cycle(now, cancel).await?;

    if report.is_partial() {
        warn!(
            cycle_id = %report.cycle_id,
            failed = report.failures.len(),
            "Cycle completed with node failures"
        );
    }

    exporter
        .export(&report)
        .map_err(|e| CollectorError::Export(format!("{e:#}")))?;
    Ok(report)
}
