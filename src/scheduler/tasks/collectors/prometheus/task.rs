use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use backon::Retryable;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use crate::config::{CollectorConfig, NodeFailurePolicy};
use crate::core::client::nodes::NodeSource;
use crate::core::client::prometheus_client::MetricsQuerier;
use crate::core::client::prometheus_dto::{QueryResult, QueryWindow, RangeSeries};
use crate::domain::cluster::cluster_node::ClusterNode;
use crate::errors::{CollectorError, NodeSourceError, Result};
use crate::scheduler::tasks::collectors::prometheus::cycle_report::{CycleReport, NodeQueryFailure};
use crate::scheduler::tasks::collectors::prometheus::mappers::{map_collection, unattributed_series};
use crate::scheduler::tasks::collectors::prometheus::selector::MetricSelector;

type NodeOutcome = (ClusterNode, Result<QueryResult<Vec<RangeSeries>>>);

/// Drives collection cycles: discover ready nodes, query each one, map the results.
pub struct CollectionOrchestrator<S, Q> {
    node_source: S,
    querier: Q,
    config: CollectorConfig,
    selector: MetricSelector,
}

impl<S: NodeSource, Q: MetricsQuerier> CollectionOrchestrator<S, Q> {
    pub fn new(node_source: S, querier: Q, config: CollectorConfig) -> Self {
        Self {
            node_source,
            querier,
            config,
            selector: MetricSelector::default(),
        }
    }

    pub fn with_selector(mut self, selector: MetricSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Runs one cycle ending at `now`, bounded by the cycle deadline and `cancel`.
    pub async fn run_cycle(&self, now: DateTime<Utc>, cancel: &CancellationToken) -> Result<CycleReport> {
        let cycle_id = Uuid::new_v4();
        let deadline = self.config.cycle_timeout;
        let span = tracing::info_span!("collection_cycle", %cycle_id);

        async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("Collection cycle cancelled");
                    Err(CollectorError::Cancelled)
                }
                outcome = tokio::time::timeout(deadline, self.collect(cycle_id, now)) => {
                    outcome.unwrap_or(Err(CollectorError::CycleDeadline { timeout: deadline }))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn collect(&self, cycle_id: Uuid, now: DateTime<Utc>) -> Result<CycleReport> {
        debug!("Starting Prometheus collection cycle...");

        let nodes = self.discover_nodes().await?;
        let window = QueryWindow::ending_at(now, self.config.lookback, self.config.step)?;
        let query = self.selector.expression();
        debug!(nodes = nodes.len(), %window, "Querying ready nodes");

        let outcomes = self.query_nodes(nodes, &query, &window).await?;

        let mut report = CycleReport::new(cycle_id, window);
        let mut warnings = BTreeSet::new();
        let mut unattributed_checked = false;
        for (node, outcome) in outcomes {
            match outcome {
                Ok(result) => {
                    // Every node sees the same selector, so one matrix is enough to check.
                    if !unattributed_checked {
                        unattributed_checked = true;
                        let unattributed = unattributed_series(&result.data);
                        if unattributed > 0 {
                            warn!(unattributed, "Series without a node label were not attributed to any node");
                        }
                    }
                    warnings.extend(result.warnings);
                    report.nodes.push(map_collection(&node, &window, &result.data));
                }
                Err(e) => {
                    error!(node = %node.name, %window, "❌ Prometheus query failed: {}", e);
                    report
                        .failures
                        .push(NodeQueryFailure::new(&node.name, &query, &window, &e));
                }
            }
        }
        report.warnings = warnings.into_iter().collect();

        info!(
            nodes = report.nodes.len(),
            pods = report.pod_count(),
            failures = report.failures.len(),
            "Collection cycle finished"
        );
        Ok(report)
    }

    /// Lists ready nodes, retrying conflict errors with backoff.
    async fn discover_nodes(&self) -> Result<Vec<ClusterNode>> {
        let attempts = AtomicUsize::new(0);
        let counter = &attempts;
        let source = &self.node_source;

        let listed = (move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            source.get_ready_nodes().await
        })
        .retry(self.config.node_retry.backoff())
        .sleep(tokio::time::sleep)
        .when(NodeSourceError::is_conflict)
        .notify(|err: &NodeSourceError, delay: Duration| {
            warn!("Node listing conflict, retrying in {:?}: {}", delay, err);
        })
        .await;

        let attempts = attempts.load(Ordering::SeqCst);
        match listed {
            Ok(nodes) => {
                debug!(attempts, "Discovered {} ready node(s)", nodes.len());
                Ok(nodes)
            }
            Err(e) => Err(CollectorError::CycleAbort {
                attempts,
                reason: format!("unable to get a list of nodes: {e}"),
            }),
        }
    }

    /// One range query per node, at most `max_concurrency` in flight.
    /// Results come back sorted by node name, not completion order.
    async fn query_nodes(
        &self,
        nodes: Vec<ClusterNode>,
        query: &str,
        window: &QueryWindow,
    ) -> Result<Vec<NodeOutcome>> {
        let querier = &self.querier;
        let mut in_flight = futures::stream::iter(nodes)
            .map(move |node| async move {
                if !node.has_provider_id() {
                    warn!(
                        node = %node.name,
                        "Provider ID for node does not exist. \
                         If this condition persists it will cause inconsistent cluster allocation"
                    );
                }
                let result = querier.range_query(query, window).await;
                (node, result)
            })
            .buffer_unordered(self.config.max_concurrency.max(1));

        let mut outcomes = Vec::new();
        let abort_on_failure = self.config.failure_policy == NodeFailurePolicy::AbortCycle;
        while let Some((node, result)) = in_flight.next().await {
            match result {
                Err(e) if abort_on_failure => {
                    error!(node = %node.name, %window, "❌ Prometheus query failed, aborting cycle: {}", e);
                    return Err(CollectorError::NodeQuery {
                        node: node.name,
                        window: window.to_string(),
                        source: Box::new(e),
                    });
                }
                result => outcomes.push((node, result)),
            }
        }

        outcomes.sort_by(|(a, _), (b, _)| a.name.cmp(&b.name));
        Ok(outcomes)
    }
}
