//! Collects per-node and per-pod resource metrics from a Prometheus-compatible backend
//! and reshapes them into heapster-clone records.

pub mod config;
pub mod core;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod scheduler;

pub use config::CollectorConfig;
pub use errors::{CollectorError, Result};
