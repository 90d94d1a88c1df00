use anyhow::Result;
use kube::{Client, Config};
use tracing::debug;

/// Creates a Kubernetes client from the in-cluster service account or the local kubeconfig.
pub async fn build_kube_client() -> Result<Client> {
    let config = Config::infer().await?;
    debug!(cluster_url = %config.cluster_url, "Using inferred Kubernetes configuration");

    let client = Client::try_from(config)?;
    debug!("Kubernetes client initialized successfully");
    Ok(client)
}
