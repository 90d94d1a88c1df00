use anyhow::{Context, Result};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use prometheus_collector_core::config::CollectorConfig;
use prometheus_collector_core::core::client::kube_client::build_kube_client;
use prometheus_collector_core::core::client::nodes::KubeNodeSource;
use prometheus_collector_core::core::client::probe::validate_backend;
use prometheus_collector_core::core::persistence::samples::metric_exporter_trait::{
    LoggingExporter, MetricExporter,
};
use prometheus_collector_core::core::persistence::samples::sample_dir_fs_adapter::SampleDirFsAdapter;
use prometheus_collector_core::logging::init_tracing;
use prometheus_collector_core::scheduler::run_scheduler;

#[tokio::main]
async fn main() -> Result<()> {
    let config = CollectorConfig::from_env().context("Failed to load configuration")?;
    let _guard = init_tracing(&config);

    info!(url = %config.prometheus_url, "Starting prometheus-collector");

    let transport = Client::builder()
        .connect_timeout(config.query_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    if let Err(e) = validate_backend(&config, &transport).await {
        error!("❌ {}", e);
        return Err(e).context("Metrics backend validation failed");
    }

    let kube = build_kube_client().await?;
    let node_source = KubeNodeSource::new(kube);

    let exporter: Box<dyn MetricExporter> = match &config.sample_dir {
        Some(dir) => {
            info!(?dir, "Writing samples to directory");
            Box::new(SampleDirFsAdapter::new(dir))
        }
        None => Box::new(LoggingExporter),
    };

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
        }
        shutdown.cancel();
    });

    run_scheduler(config, node_source, transport, exporter, cancel).await?;
    Ok(())
}
