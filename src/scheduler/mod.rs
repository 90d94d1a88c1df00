use std::time::Duration;

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::CollectorConfig;
use crate::core::client::nodes::NodeSource;
use crate::core::persistence::samples::metric_exporter_trait::MetricExporter;
use crate::errors::{CollectorError, Result};

pub mod tasks;

/// Runs collection cycles until `cancel` fires.
///
/// A backend that cannot be bound pauses the loop for `connection_backoff`; any other
/// cycle error is logged and the next tick proceeds after `collection_interval`.
pub async fn run_scheduler<S>(
    config: CollectorConfig,
    node_source: S,
    transport: Client,
    exporter: Box<dyn MetricExporter>,
    cancel: CancellationToken,
) -> Result<()>
where
    S: NodeSource + Clone,
{
    info!(
        interval = ?config.collection_interval,
        url = %config.prometheus_url,
        "Collection scheduler started"
    );

    while !cancel.is_cancelled() {
        let pause = match tasks::minute::run(&config, &node_source, &transport, exporter.as_ref(), &cancel).await {
            Ok(report) => {
                info!(
                    cycle_id = %report.cycle_id,
                    nodes = report.nodes.len(),
                    pods = report.pod_count(),
                    "Collection cycle exported"
                );
                config.collection_interval
            }
            Err(CollectorError::Cancelled) => break,
            Err(e @ CollectorError::Connection { .. }) => {
                error!("❌ Error creating Prometheus client: {}", e);
                config.connection_backoff
            }
            Err(e) => {
                error!(retryable = e.is_retryable(), "❌ Collection cycle failed: {}", e);
                config.collection_interval
            }
        };

        if !sleep_or_cancel(pause, &cancel).await {
            break;
        }
    }

    info!("Collection scheduler stopped");
    Ok(())
}

/// Returns false when cancelled before `pause` elapsed.
async fn sleep_or_cancel(pause: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(pause) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cluster::cluster_node::ClusterNode;
    use crate::errors::NodeSourceError;
    use crate::scheduler::tasks::collectors::prometheus::cycle_report::CycleReport;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct CountingNodes {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl NodeSource for CountingNodes {
        async fn get_ready_nodes(&self) -> std::result::Result<Vec<ClusterNode>, NodeSourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    /// Cancels the scheduler after `stop_after` exports.
    struct StopAfter {
        cancel: CancellationToken,
        exported: Arc<AtomicUsize>,
        stop_after: usize,
    }

    impl MetricExporter for StopAfter {
        fn export(&self, _report: &CycleReport) -> anyhow::Result<()> {
            if self.exported.fetch_add(1, Ordering::SeqCst) + 1 >= self.stop_after {
                self.cancel.cancel();
            }
            Ok(())
        }
    }

    fn fast_config() -> CollectorConfig {
        CollectorConfig {
            collection_interval: Duration::from_millis(5),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn cancelled_scheduler_runs_no_cycle() {
        let nodes = CountingNodes::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let exporter = StopAfter {
            cancel: cancel.clone(),
            exported: Arc::default(),
            stop_after: 1,
        };

        run_scheduler(fast_config(), nodes.clone(), Client::new(), Box::new(exporter), cancel)
            .await
            .unwrap();

        assert_eq!(nodes.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn runs_cycles_until_cancelled() {
        let nodes = CountingNodes::default();
        let cancel = CancellationToken::new();
        let exported = Arc::new(AtomicUsize::new(0));
        let exporter = StopAfter {
            cancel: cancel.clone(),
            exported: exported.clone(),
            stop_after: 3,
        };

        run_scheduler(fast_config(), nodes.clone(), Client::new(), Box::new(exporter), cancel)
            .await
            .unwrap();

        assert_eq!(exported.load(Ordering::SeqCst), 3);
        assert_eq!(nodes.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn connection_errors_back_off() {
        let cancel = CancellationToken::new();
        let config = CollectorConfig {
            prometheus_url: "not a url".into(),
            ..fast_config()
        };
        let exporter = StopAfter {
            cancel: cancel.clone(),
            exported: Arc::default(),
            stop_after: 1,
        };

        let stopper = cancel.clone();
        let handle = tokio::spawn(run_scheduler(
            config.clone(),
            CountingNodes::default(),
            Client::new(),
            Box::new(exporter),
            cancel,
        ));

        tokio::time::sleep(config.connection_backoff / 2).await;
        assert!(!handle.is_finished());
        stopper.cancel();
        handle.await.unwrap().unwrap();
    }
}
