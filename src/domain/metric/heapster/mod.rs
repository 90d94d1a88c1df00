//! Heapster-clone output schema.
//!
//! Downstream consumers parse these records by their JSON field names, so names, nesting
//! and per-field value types are frozen under [`schema::SCHEMA_VERSION`].

pub mod metric_point;
pub mod node_metric_record;
pub mod pod_metric_record;
pub mod schema;
