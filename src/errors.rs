use std::time::Duration;

use thiserror::Error;

/// Result alias used across the collector.
pub type Result<T> = std::result::Result<T, CollectorError>;

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Cannot connect to metrics backend at {address}: {reason}")]
    Connection { address: String, reason: String },

    #[error("Query timed out after {timeout:?} (query={query})")]
    QueryTimeout { query: String, timeout: Duration },

    #[error("Transport error while querying metrics backend (query={query}): {reason}")]
    Transport { query: String, reason: String },

    #[error("Metrics backend rejected query ({error_type}): {message} (query={query})")]
    QueryRejected {
        query: String,
        error_type: String,
        message: String,
    },

    #[error("Failed to decode metrics backend response (query={query}): {reason}")]
    Decode { query: String, reason: String },

    #[error("Collection cycle aborted after {attempts} node discovery attempt(s): {reason}")]
    CycleAbort { attempts: usize, reason: String },

    #[error("Collection cycle aborted by query failure on node {node} ({window}): {source}")]
    NodeQuery {
        node: String,
        window: String,
        #[source]
        source: Box<CollectorError>,
    },

    #[error("Unable to reach metrics backend at {url} after {attempts} attempt(s): {reason}")]
    ProbeUnreachable {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("Collection cycle exceeded its deadline of {timeout:?}")]
    CycleDeadline { timeout: Duration },

    #[error("Collection cycle cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Export failed: {0}")]
    Export(String),
}

impl CollectorError {
    /// Whether the next attempt (or the next cycle) may succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        match self {
            CollectorError::QueryTimeout { .. }
            | CollectorError::Transport { .. }
            | CollectorError::CycleDeadline { .. }
            | CollectorError::CycleAbort { .. }
            | CollectorError::Export(_) => true,
            CollectorError::QueryRejected { error_type, .. } => {
                matches!(error_type.as_str(), "timeout" | "unavailable")
            }
            CollectorError::NodeQuery { source, .. } => source.is_retryable(),
            CollectorError::Connection { .. }
            | CollectorError::Decode { .. }
            | CollectorError::ProbeUnreachable { .. }
            | CollectorError::Cancelled
            | CollectorError::Config(_) => false,
        }
    }
}

/// Failure reported by a node source. `conflict` marks the transient class
/// (HTTP 409 from the API server) that discovery retries with backoff.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct NodeSourceError {
    pub conflict: bool,
    pub message: String,
}

impl NodeSourceError {
    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            conflict: true,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            conflict: false,
            message: message.into(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.conflict
    }
}

impl From<kube::Error> for NodeSourceError {
    fn from(err: kube::Error) -> Self {
        let conflict = matches!(&err, kube::Error::Api(resp) if resp.code == 409);
        Self {
            conflict,
            message: format!("K8s API error: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_and_timeouts_are_retryable() {
        let timeout = CollectorError::QueryTimeout {
            query: "up".into(),
            timeout: Duration::from_secs(10),
        };
        let transport = CollectorError::Transport {
            query: "up".into(),
            reason: "connection reset".into(),
        };
        assert!(timeout.is_retryable());
        assert!(transport.is_retryable());
    }

    #[test]
    fn syntax_errors_are_not_retryable() {
        let bad_data = CollectorError::QueryRejected {
            query: "{".into(),
            error_type: "bad_data".into(),
            message: "parse error".into(),
        };
        let unavailable = CollectorError::QueryRejected {
            query: "up".into(),
            error_type: "unavailable".into(),
            message: "tsdb not ready".into(),
        };
        assert!(!bad_data.is_retryable());
        assert!(unavailable.is_retryable());
    }

    #[test]
    fn node_query_inherits_source_classification() {
        let err = CollectorError::NodeQuery {
            node: "node-b".into(),
            window: "[t0, t1] step 60s".into(),
            source: Box::new(CollectorError::Connection {
                address: "http://prom".into(),
                reason: "refused".into(),
            }),
        };
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("node-b"));
    }

    #[test]
    fn node_source_error_constructors() {
        assert!(NodeSourceError::conflict("409").is_conflict());
        assert!(!NodeSourceError::other("boom").is_conflict());
    }
}
