use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::core::client::prometheus_dto::{
    format_timestamp, ApiResponse, ApiStatus, LabelSet, QueryData, QueryResult, QueryWindow,
    RangeSeries,
};
use crate::errors::{CollectorError, Result};

const QUERY_PATH: &str = "api/v1/query";
const QUERY_RANGE_PATH: &str = "api/v1/query_range";
const SERIES_PATH: &str = "api/v1/series";

/// Query capability the collection cycle depends on.
#[async_trait]
pub trait MetricsQuerier: Send + Sync {
    /// Range query over `window`; the result is a matrix.
    async fn range_query(
        &self,
        query: &str,
        window: &QueryWindow,
    ) -> Result<QueryResult<Vec<RangeSeries>>>;

    /// Instant query evaluated at `at`.
    async fn instant_query(&self, query: &str, at: DateTime<Utc>)
        -> Result<QueryResult<QueryData>>;
}

/// Handle on a Prometheus-compatible HTTP API.
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    base_url: Url,
    http: Client,
    timeout: Duration,
}

impl PrometheusClient {
    /// Binds `address` to the given transport. Every call made through the handle is
    /// bounded by `timeout`.
    pub fn connect(address: &str, transport: Client, timeout: Duration) -> Result<Self> {
        let connection_error = |reason: String| CollectorError::Connection {
            address: address.to_string(),
            reason,
        };

        let mut base_url = Url::parse(address.trim()).map_err(|e| connection_error(e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(connection_error(format!(
                "unsupported scheme '{}'",
                base_url.scheme()
            )));
        }
        if base_url.cannot_be_a_base() || base_url.host_str().is_none() {
            return Err(connection_error("address has no host".into()));
        }
        if timeout.is_zero() {
            return Err(connection_error("query timeout must be positive".into()));
        }

        // Url::join replaces the last segment unless the path ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        base_url.set_query(None);
        base_url.set_fragment(None);

        debug!("Prometheus client bound to {}", base_url);
        Ok(Self {
            base_url,
            http: transport,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Label sets of all series matching any of `matchers` inside `[start, end]`.
    pub async fn series(
        &self,
        matchers: &[&str],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<QueryResult<Vec<LabelSet>>> {
        let label = matchers.join(" or ");
        let mut params: Vec<(&str, String)> = matchers
            .iter()
            .map(|m| ("match[]", m.to_string()))
            .collect();
        params.push(("start", format_timestamp(start)));
        params.push(("end", format_timestamp(end)));

        self.get(SERIES_PATH, &params, &label).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        query: &str,
    ) -> Result<QueryResult<T>> {
        let url = self.base_url.join(path).map_err(|e| CollectorError::Connection {
            address: self.base_url.to_string(),
            reason: e.to_string(),
        })?;

        let request = async {
            let resp = self
                .http
                .get(url)
                .query(params)
                .send()
                .await
                .map_err(|e| self.transport_error(query, e))?;
            let status = resp.status();
            let body = resp
                .text()
                .await
                .map_err(|e| self.transport_error(query, e))?;
            decode_response::<T>(query, status, &body)
        };

        let result = self.with_deadline(query, request).await?;
        if !result.warnings.is_empty() {
            warn!(query, warnings = ?result.warnings, "Prometheus query returned warnings");
        }
        Ok(result)
    }

    async fn with_deadline<F, T>(&self, query: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| CollectorError::QueryTimeout {
                query: query.to_string(),
                timeout: self.timeout,
            })?
    }

    fn transport_error(&self, query: &str, err: reqwest::Error) -> CollectorError {
        if err.is_timeout() {
            return CollectorError::QueryTimeout {
                query: query.to_string(),
                timeout: self.timeout,
            };
        }
        // Strip the URL: it may carry credentials from the base address.
        CollectorError::Transport {
            query: query.to_string(),
            reason: err.without_url().to_string(),
        }
    }
}

#[async_trait]
impl MetricsQuerier for PrometheusClient {
    async fn range_query(
        &self,
        query: &str,
        window: &QueryWindow,
    ) -> Result<QueryResult<Vec<RangeSeries>>> {
        let mut params = vec![("query", query.to_string())];
        params.extend(window.as_params());

        let result: QueryResult<QueryData> = self.get(QUERY_RANGE_PATH, &params, query).await?;
        match result.data {
            QueryData::Matrix(series) => {
                debug!(query, series = series.len(), %window, "Range query completed");
                Ok(QueryResult {
                    data: series,
                    warnings: result.warnings,
                })
            }
            other => Err(CollectorError::Decode {
                query: query.to_string(),
                reason: format!("expected matrix result, got {}", other.result_type()),
            }),
        }
    }

    async fn instant_query(
        &self,
        query: &str,
        at: DateTime<Utc>,
    ) -> Result<QueryResult<QueryData>> {
        let params = [("query", query.to_string()), ("time", format_timestamp(at))];
        let result = self.get(QUERY_PATH, &params, query).await?;
        match &result.data {
            QueryData::Matrix(_) => Err(CollectorError::Decode {
                query: query.to_string(),
                reason: "instant query returned a matrix".into(),
            }),
            _ => Ok(result),
        }
    }
}

/// Maps an HTTP exchange onto the result or error taxonomy.
///
/// Prometheus reports query errors with 400/422/503 and a JSON error envelope, so the
/// body is inspected before the status code.
fn decode_response<T: DeserializeOwned>(
    query: &str,
    status: reqwest::StatusCode,
    body: &str,
) -> Result<QueryResult<T>> {
    let envelope: ApiResponse<T> = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) if status.is_success() => {
            return Err(CollectorError::Decode {
                query: query.to_string(),
                reason: e.to_string(),
            })
        }
        Err(_) => {
            return Err(CollectorError::Transport {
                query: query.to_string(),
                reason: format!("backend returned HTTP {status}"),
            })
        }
    };

    match envelope.status {
        ApiStatus::Error => Err(CollectorError::QueryRejected {
            query: query.to_string(),
            error_type: envelope.error_type.unwrap_or_else(|| "unknown".into()),
            message: envelope.error.unwrap_or_default(),
        }),
        ApiStatus::Success => {
            let data = envelope.data.ok_or_else(|| CollectorError::Decode {
                query: query.to_string(),
                reason: "success response without data".into(),
            })?;
            Ok(QueryResult {
                data,
                warnings: envelope.warnings,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn connect_rejects_malformed_addresses() {
        let timeout = Duration::from_secs(10);
        for address in ["not a url", "ftp://prometheus:9090", "mailto:ops@example.com"] {
            let err = PrometheusClient::connect(address, Client::new(), timeout).unwrap_err();
            assert!(
                matches!(err, CollectorError::Connection { .. }),
                "{address} should fail with a connection error, got {err:?}"
            );
        }
    }

    #[test]
    fn connect_keeps_path_prefix() {
        let client = PrometheusClient::connect(
            "https://metrics.example.com/prometheus",
            Client::new(),
            Duration::from_secs(10),
        )
        .unwrap();
        assert_eq!(
            client.base_url().join(QUERY_RANGE_PATH).unwrap().as_str(),
            "https://metrics.example.com/prometheus/api/v1/query_range"
        );
    }

    #[test]
    fn backend_errors_are_distinguished_from_transport_errors() {
        let rejected = decode_response::<QueryData>(
            "sum(",
            StatusCode::BAD_REQUEST,
            r#"{"status":"error","errorType":"bad_data","error":"unexpected end of input"}"#,
        )
        .unwrap_err();
        assert!(matches!(
            rejected,
            CollectorError::QueryRejected { ref error_type, .. } if error_type == "bad_data"
        ));

        let gateway = decode_response::<QueryData>("up", StatusCode::BAD_GATEWAY, "<html>")
            .unwrap_err();
        assert!(matches!(gateway, CollectorError::Transport { .. }));
        assert!(gateway.is_retryable());

        let garbage = decode_response::<QueryData>("up", StatusCode::OK, "{").unwrap_err();
        assert!(matches!(garbage, CollectorError::Decode { .. }));
    }

    #[test]
    fn warnings_are_carried_with_data() {
        let result = decode_response::<QueryData>(
            "up",
            StatusCode::OK,
            r#"{"status":"success","data":{"resultType":"vector","result":[]},"warnings":["w1"]}"#,
        )
        .unwrap();
        assert_eq!(result.data, QueryData::Vector(vec![]));
        assert_eq!(result.warnings, vec!["w1".to_string()]);
    }
}
