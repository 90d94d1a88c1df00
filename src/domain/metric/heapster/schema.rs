//! Binding of backend metric names to heapster-clone fields.
//!
//! The binding tables and [`MetricField::encoding`] decide which series feed a field and
//! how their samples are decoded and merged; the JSON names live on the record structs.
//! Adding a binding is backwards compatible; renaming a field or changing its encoding
//! is not and requires a new [`SCHEMA_VERSION`].

pub const SCHEMA_VERSION: &str = "heapster-clone/v1";

/// How raw samples become a field value, and how samples of several series bound to
/// the same field and timestamp are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueEncoding {
    /// Kept verbatim as the backend rendered it (memory and CPU quotas). First series wins.
    Quota,
    /// Summed, then rounded to the nearest `i64`.
    Signed,
    /// Summed, then rounded to the nearest `u64`; negative samples are rejected.
    Unsigned,
    /// The sample is a start time in Unix seconds; the value is the time elapsed between
    /// it and the sample timestamp. Negative results are rejected, the largest one wins.
    Elapsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricField {
    CpuLimit,
    CpuUsage,
    FilesystemLimit,
    FilesystemUsage,
    MemoryCache,
    MemoryLimit,
    MemoryRss,
    MemoryUsage,
    NetworkRx,
    NetworkTx,
    Uptime,
    FilesystemInodes,
    FilesystemInodesFree,
}

impl MetricField {
    pub const fn encoding(self) -> ValueEncoding {
        match self {
            MetricField::CpuLimit | MetricField::MemoryLimit => ValueEncoding::Quota,
            MetricField::MemoryUsage | MetricField::NetworkRx | MetricField::NetworkTx => {
                ValueEncoding::Unsigned
            }
            MetricField::Uptime => ValueEncoding::Elapsed,
            MetricField::CpuUsage
            | MetricField::FilesystemLimit
            | MetricField::FilesystemUsage
            | MetricField::MemoryCache
            | MetricField::MemoryRss
            | MetricField::FilesystemInodes
            | MetricField::FilesystemInodesFree => ValueEncoding::Signed,
        }
    }

    /// Filesystem fields carry a per-device `labels.resource_id`.
    pub const fn is_filesystem(self) -> bool {
        matches!(
            self,
            MetricField::FilesystemLimit
                | MetricField::FilesystemUsage
                | MetricField::FilesystemInodes
                | MetricField::FilesystemInodesFree
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldBinding {
    pub metric: &'static str,
    pub field: MetricField,
    /// Multiplier applied before numeric rounding.
    pub scale: f64,
}

const fn bind(metric: &'static str, field: MetricField) -> FieldBinding {
    FieldBinding {
        metric,
        field,
        scale: 1.0,
    }
}

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;
const MILLIS_PER_SECOND: f64 = 1_000.0;

/// Container uptime in milliseconds, derived from the container start time.
const UPTIME: FieldBinding = FieldBinding {
    metric: "container_start_time_seconds",
    field: MetricField::Uptime,
    scale: MILLIS_PER_SECOND,
};

/// Node-scoped series: kube-state-metrics capacity plus the root cgroup from cAdvisor.
pub const NODE_FIELDS: &[FieldBinding] = &[
    bind("kube_node_status_capacity_cpu_cores", MetricField::CpuLimit),
    FieldBinding {
        metric: "container_cpu_usage_seconds_total",
        field: MetricField::CpuUsage,
        scale: NANOS_PER_SECOND,
    },
    bind("container_fs_limit_bytes", MetricField::FilesystemLimit),
    bind("container_fs_usage_bytes", MetricField::FilesystemUsage),
    bind("container_memory_cache", MetricField::MemoryCache),
    bind("kube_node_status_capacity_memory_bytes", MetricField::MemoryLimit),
    bind("container_memory_rss", MetricField::MemoryRss),
    bind("container_memory_usage_bytes", MetricField::MemoryUsage),
    bind("container_network_receive_bytes_total", MetricField::NetworkRx),
    bind("container_network_transmit_bytes_total", MetricField::NetworkTx),
    UPTIME,
    bind("container_fs_inodes_total", MetricField::FilesystemInodes),
    bind("container_fs_inodes_free", MetricField::FilesystemInodesFree),
];

/// Container-scoped series.
pub const POD_FIELDS: &[FieldBinding] = &[
    bind("container_spec_cpu_quota", MetricField::CpuLimit),
    FieldBinding {
        metric: "container_cpu_usage_seconds_total",
        field: MetricField::CpuUsage,
        scale: NANOS_PER_SECOND,
    },
    bind("container_fs_limit_bytes", MetricField::FilesystemLimit),
    bind("container_fs_usage_bytes", MetricField::FilesystemUsage),
    bind("container_memory_cache", MetricField::MemoryCache),
    bind("container_spec_memory_limit_bytes", MetricField::MemoryLimit),
    bind("container_memory_rss", MetricField::MemoryRss),
    bind("container_memory_usage_bytes", MetricField::MemoryUsage),
    bind("container_network_receive_bytes_total", MetricField::NetworkRx),
    bind("container_network_transmit_bytes_total", MetricField::NetworkTx),
    UPTIME,
];

/// Series that only feed labels.
pub const NODE_INFO_METRIC: &str = "kube_node_info";

pub fn node_binding(metric: &str) -> Option<&'static FieldBinding> {
    NODE_FIELDS.iter().find(|b| b.metric == metric)
}

pub fn pod_binding(metric: &str) -> Option<&'static FieldBinding> {
    POD_FIELDS.iter().find(|b| b.metric == metric)
}
