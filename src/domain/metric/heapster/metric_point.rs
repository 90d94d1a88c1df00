use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One sampling interval of a metric. Field order is part of the wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint<V> {
    pub end: DateTime<Utc>,
    pub start: DateTime<Utc>,
    pub value: V,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSystemLabel {
    pub resource_id: String,
}

/// Filesystem variant of [`MetricPoint`], scoped to one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FsMetricPoint<V> {
    pub end: DateTime<Utc>,
    pub labels: FileSystemLabel,
    pub start: DateTime<Utc>,
    pub value: V,
}

impl<V> MetricPoint<V> {
    pub fn scoped(self, resource_id: impl Into<String>) -> FsMetricPoint<V> {
        FsMetricPoint {
            end: self.end,
            labels: FileSystemLabel {
                resource_id: resource_id.into(),
            },
            start: self.start,
            value: self.value,
        }
    }
}
