use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use crate::config::CollectorConfig;
use crate::errors::{CollectorError, Result};

/// Outcome of a reachability check.
#[derive(Debug)]
pub struct ProbeReport {
    pub reachable: bool,
    pub attempts: u32,
    pub error: Option<CollectorError>,
}

impl ProbeReport {
    pub fn into_result(self) -> Result<()> {
        match self.error {
            Some(err) if !self.reachable => Err(err),
            _ => Ok(()),
        }
    }
}

/// Issues up to `attempts` GET requests against `base_url`, `delay` apart.
/// Any 2xx response counts as reachable; an attempt without a response within
/// `timeout` counts as failed.
pub async fn check_reachable(
    client: &Client,
    base_url: &str,
    attempts: u32,
    delay: Duration,
    timeout: Duration,
) -> ProbeReport {
    let attempts = attempts.max(1);
    let mut last_error = String::from("no attempt made");

    for attempt in 1..=attempts {
        match tokio::time::timeout(timeout, client.get(base_url).send()).await {
            Err(_) => last_error = format!("no response within {timeout:?}"),
            Ok(Ok(resp)) if resp.status().is_success() => {
                debug!(attempt, "Metrics backend answered with {}", resp.status());
                return ProbeReport {
                    reachable: true,
                    attempts: attempt,
                    error: None,
                };
            }
            Ok(Ok(resp)) => last_error = format!("unexpected status {}", resp.status()),
            Ok(Err(e)) => last_error = e.without_url().to_string(),
        }

        warn!(attempt, attempts, "Metrics backend probe failed: {}", last_error);
        if attempt < attempts && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    ProbeReport {
        reachable: false,
        attempts,
        error: Some(CollectorError::ProbeUnreachable {
            url: base_url.to_string(),
            attempts,
            reason: last_error,
        }),
    }
}

/// Startup gate: the configured backend must answer before any cycle runs.
pub async fn validate_backend(config: &CollectorConfig, client: &Client) -> Result<()> {
    check_reachable(
        client,
        &config.prometheus_url,
        config.probe_retry_count,
        config.probe_retry_delay,
        config.query_timeout,
    )
    .await
    .into_result()?;

    debug!("Connected to Prometheus at: {}", config.prometheus_url);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_backend_reports_false_with_error() {
        // Port 9 (discard) on loopback is not expected to be listening.
        let report = check_reachable(
            &Client::new(),
            "http://127.0.0.1:9",
            2,
            Duration::ZERO,
            Duration::from_secs(5),
        )
        .await;

        assert!(!report.reachable);
        assert_eq!(report.attempts, 2);
        assert!(matches!(
            report.error,
            Some(CollectorError::ProbeUnreachable { attempts: 2, .. })
        ));
    }

    #[tokio::test]
    async fn validate_backend_is_fatal_when_unreachable() {
        let config = CollectorConfig {
            prometheus_url: "http://127.0.0.1:9".into(),
            probe_retry_count: 1,
            probe_retry_delay: Duration::ZERO,
            ..CollectorConfig::default()
        };
        let err = validate_backend(&config, &Client::new()).await.unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn reachable_report_is_ok() {
        let report = ProbeReport {
            reachable: true,
            attempts: 1,
            error: None,
        };
        assert!(report.into_result().is_ok());
    }
}
