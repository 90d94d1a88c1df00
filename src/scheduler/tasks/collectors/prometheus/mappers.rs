/* Maps raw Prometheus matrices → heapster-clone records */

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::core::client::prometheus_dto::{QueryWindow, RangeSeries};
use crate::domain::cluster::cluster_node::ClusterNode;
use crate::domain::metric::heapster::metric_point::{FsMetricPoint, MetricPoint};
use crate::domain::metric::heapster::node_metric_record::{
    NodeLabels, NodeMetricRecord, NodeMetrics,
};
use crate::domain::metric::heapster::pod_metric_record::{
    PodLabels, PodMetricRecord, PodMetrics,
};
use crate::domain::metric::heapster::schema::{
    node_binding, pod_binding, FieldBinding, MetricField, ValueEncoding, NODE_INFO_METRIC,
};
use crate::scheduler::tasks::collectors::prometheus::cycle_report::NodeCollection;

/// Checked in order; the first one present decides which node owns a series.
const NODE_IDENTITY_LABELS: &[&str] = &["node", "kubernetes_io_hostname", "instance"];
const POD_LABELS: &[&str] = &["pod", "pod_name"];
const CONTAINER_LABELS: &[&str] = &["container", "container_name"];
const POD_UID_LABELS: &[&str] = &["pod_uid", "uid"];
const KUBE_LABEL_PREFIX: &str = "label_";
const ROOT_CGROUP: &str = "/";

pub fn map_collection(
    node: &ClusterNode,
    window: &QueryWindow,
    matrix: &[RangeSeries],
) -> NodeCollection {
    NodeCollection {
        node: map_node(node, window, matrix),
        pods: map_pods(node, window, matrix),
    }
}

pub fn map_node(node: &ClusterNode, window: &QueryWindow, matrix: &[RangeSeries]) -> NodeMetricRecord {
    let mut table = FieldTable::default();
    let mut host_id = node.provider_id.clone();
    let mut hostname = node.hostname.clone();

    for series in owned_series(node, matrix) {
        if first_label(series, POD_LABELS).is_some() {
            continue;
        }
        // Only the root cgroup describes the whole machine.
        if series.label("id").is_some_and(|id| id != ROOT_CGROUP) {
            continue;
        }
        let Some(name) = series.name() else {
            continue;
        };

        if name == NODE_INFO_METRIC {
            if host_id.is_empty() {
                if let Some(provider_id) = series.label("provider_id") {
                    host_id = provider_id.to_string();
                }
            }
            if hostname.is_none() {
                hostname = series.label("internal_ip").map(str::to_string);
            }
            continue;
        }

        if let Some(binding) = node_binding(name) {
            table.add(binding, series);
        }
    }

    NodeMetricRecord {
        labels: NodeLabels {
            host_id,
            hostname: hostname.unwrap_or_else(|| node.name.clone()),
            labels: flatten_labels(&node.labels),
            nodename: node.name.clone(),
        },
        metrics: NodeMetrics {
            cpu_limit: table.points(MetricField::CpuLimit, window),
            cpu_usage: table.points(MetricField::CpuUsage, window),
            filesystem_limit: table.fs_points(MetricField::FilesystemLimit, window),
            filesystem_usage: table.fs_points(MetricField::FilesystemUsage, window),
            memory_cache: table.points(MetricField::MemoryCache, window),
            memory_limit: table.points(MetricField::MemoryLimit, window),
            memory_rss: table.points(MetricField::MemoryRss, window),
            memory_usage: table.points(MetricField::MemoryUsage, window),
            network_rx: table.points(MetricField::NetworkRx, window),
            network_tx: table.points(MetricField::NetworkTx, window),
            uptime: table.points(MetricField::Uptime, window),
            filesystem_inodes: table.fs_points(MetricField::FilesystemInodes, window),
            filesystem_inodes_free: table.fs_points(MetricField::FilesystemInodesFree, window),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct PodKey {
    namespace: String,
    pod: String,
    container: String,
}

pub fn map_pods(node: &ClusterNode, window: &QueryWindow, matrix: &[RangeSeries]) -> Vec<PodMetricRecord> {
    let mut groups: BTreeMap<PodKey, (PodLabels, FieldTable)> = BTreeMap::new();

    for series in owned_series(node, matrix) {
        let Some(pod) = first_label(series, POD_LABELS) else {
            continue;
        };
        let Some(binding) = series.name().and_then(pod_binding) else {
            continue;
        };

        let key = PodKey {
            namespace: series.label("namespace").unwrap_or_default().to_string(),
            pod: pod.to_string(),
            container: first_label(series, CONTAINER_LABELS)
                .unwrap_or_default()
                .to_string(),
        };

        let (labels, table) = groups
            .entry(key)
            .or_insert_with_key(|key| (pod_labels(node, key), FieldTable::default()));
        // A uid from any series of the group beats the namespace/name fallback.
        if let Some(uid) = first_label(series, POD_UID_LABELS) {
            if labels.pod_id.is_empty() {
                labels.pod_id = uid.to_string();
            }
        }
        for (k, v) in kube_labels(series) {
            labels.labels.entry(k).or_insert(v);
        }
        table.add(binding, series);
    }

    groups
        .into_iter()
        .map(|(key, (mut labels, table))| {
            if labels.pod_id.is_empty() {
                labels.pod_id = format!("{}/{}", key.namespace, key.pod);
            }
            PodMetricRecord {
                labels,
                metrics: PodMetrics {
                    cpu_limit: table.points(MetricField::CpuLimit, window),
                    cpu_usage: table.points(MetricField::CpuUsage, window),
                    filesystem_limit: table.fs_points(MetricField::FilesystemLimit, window),
                    filesystem_usage: table.fs_points(MetricField::FilesystemUsage, window),
                    memory_cache: table.points(MetricField::MemoryCache, window),
                    memory_limit: table.points(MetricField::MemoryLimit, window),
                    memory_rss: table.points(MetricField::MemoryRss, window),
                    memory_usage: table.points(MetricField::MemoryUsage, window),
                    network_rx: table.points(MetricField::NetworkRx, window),
                    network_tx: table.points(MetricField::NetworkTx, window),
                    uptime: table.points(MetricField::Uptime, window),
                },
            }
        })
        .collect()
}

/// `pod_id` is left empty here and settled once every series of the group was seen.
fn pod_labels(node: &ClusterNode, key: &PodKey) -> PodLabels {
    PodLabels {
        container_name: key.container.clone(),
        host_id: node.provider_id.clone(),
        hostname: node.hostname_or_name().to_string(),
        labels: BTreeMap::new(),
        namespace_id: key.namespace.clone(),
        nodename: node.name.clone(),
        pod_id: String::new(),
        pod_name: key.pod.clone(),
    }
}

/// Series owned by `node`, in label-set order so output never depends on response order.
///
/// Every node is queried with the same cluster-wide selector, so a series without any
/// node identity label cannot be attributed and is left out of every record.
fn owned_series<'a>(node: &ClusterNode, matrix: &'a [RangeSeries]) -> Vec<&'a RangeSeries> {
    let mut owned: Vec<&RangeSeries> = matrix
        .iter()
        .filter(|series| {
            series_node(series)
                .is_some_and(|owner| owner == node.name || Some(owner) == node.hostname.as_deref())
        })
        .collect();
    owned.sort_by(|a, b| a.metric.cmp(&b.metric));
    owned
}

/// Number of series in `matrix` that no node can claim.
pub fn unattributed_series(matrix: &[RangeSeries]) -> usize {
    matrix.iter().filter(|s| series_node(s).is_none()).count()
}

fn series_node(series: &RangeSeries) -> Option<&str> {
    first_label(series, NODE_IDENTITY_LABELS).map(strip_port)
}

fn strip_port(instance: &str) -> &str {
    match instance.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
            host.trim_start_matches('[').trim_end_matches(']')
        }
        _ => instance,
    }
}

fn first_label<'a>(series: &'a RangeSeries, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| series.label(key))
}

fn kube_labels(series: &RangeSeries) -> impl Iterator<Item = (String, String)> + '_ {
    series.metric.iter().filter_map(|(k, v)| {
        k.strip_prefix(KUBE_LABEL_PREFIX)
            .map(|name| (name.to_string(), v.clone()))
    })
}

fn flatten_labels(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{k}:{v}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// One merged sample: the raw string for quota fields, a number for everything else.
#[derive(Debug, Clone, PartialEq)]
enum Merged {
    Raw(String),
    Number(f64),
}

/// Device (empty unless the field is filesystem scoped) and sample timestamp.
type PointKey = (String, DateTime<Utc>);

/// Samples of every series bound to a field, merged per timestamp according to the
/// field's [`ValueEncoding`].
#[derive(Debug, Default)]
struct FieldTable {
    fields: BTreeMap<MetricField, BTreeMap<PointKey, Merged>>,
}

impl FieldTable {
    fn add(&mut self, binding: &FieldBinding, series: &RangeSeries) {
        let field = binding.field;
        let encoding = field.encoding();
        let device = if field.is_filesystem() {
            series.label("device").unwrap_or_default()
        } else {
            ""
        };
        let points = self.fields.entry(field).or_default();

        for sample in &series.values {
            let Some(end) = sample.timestamp() else {
                continue;
            };
            let key = (device.to_string(), end);

            if encoding == ValueEncoding::Quota {
                let raw = sample.value().trim();
                if !raw.is_empty() {
                    points.entry(key).or_insert_with(|| Merged::Raw(raw.to_string()));
                }
                continue;
            }

            let Ok(raw) = sample.value().trim().parse::<f64>() else {
                continue;
            };
            let value = match encoding {
                ValueEncoding::Elapsed => (sample.0 - raw) * binding.scale,
                _ => raw * binding.scale,
            };
            if !value.is_finite() || (value < 0.0 && encoding != ValueEncoding::Signed) {
                continue;
            }

            match points.entry(key).or_insert(Merged::Number(0.0)) {
                Merged::Number(merged) if encoding == ValueEncoding::Elapsed => {
                    *merged = merged.max(value)
                }
                Merged::Number(merged) => *merged += value,
                Merged::Raw(_) => {}
            }
        }
    }

    fn points<V: FieldValue>(&self, field: MetricField, window: &QueryWindow) -> Vec<MetricPoint<V>> {
        debug_assert!(!field.is_filesystem(), "{field:?} is device scoped");
        self.decoded::<V>(field)
            .map(|(_, end, value)| MetricPoint {
                end,
                start: interval_start(window, end),
                value,
            })
            .collect()
    }

    fn fs_points<V: FieldValue>(&self, field: MetricField, window: &QueryWindow) -> Vec<FsMetricPoint<V>> {
        debug_assert!(field.is_filesystem(), "{field:?} is not device scoped");
        self.decoded::<V>(field)
            .map(|(device, end, value)| {
                MetricPoint {
                    end,
                    start: interval_start(window, end),
                    value,
                }
                .scoped(device)
            })
            .collect()
    }

    /// Points in `(device, end)` order; values the field type cannot hold are dropped.
    fn decoded<V: FieldValue>(&self, field: MetricField) -> impl Iterator<Item = (&str, DateTime<Utc>, V)> + '_ {
        debug_assert!(
            V::accepts(field.encoding()),
            "{field:?} is declared {:?}",
            field.encoding()
        );
        self.fields
            .get(&field)
            .into_iter()
            .flatten()
            .filter_map(|((device, end), merged)| Some((device.as_str(), *end, V::decode(merged)?)))
    }
}

/// Rust type a field is stored as, tied to the encodings it can represent.
trait FieldValue: Sized {
    fn accepts(encoding: ValueEncoding) -> bool;
    fn decode(merged: &Merged) -> Option<Self>;
}

impl FieldValue for String {
    fn accepts(encoding: ValueEncoding) -> bool {
        encoding == ValueEncoding::Quota
    }

    fn decode(merged: &Merged) -> Option<Self> {
        match merged {
            Merged::Raw(raw) => Some(raw.clone()),
            Merged::Number(_) => None,
        }
    }
}

impl FieldValue for i64 {
    fn accepts(encoding: ValueEncoding) -> bool {
        matches!(encoding, ValueEncoding::Signed | ValueEncoding::Elapsed)
    }

    fn decode(merged: &Merged) -> Option<Self> {
        let Merged::Number(value) = merged else {
            return None;
        };
        let value = value.round();
        (value >= i64::MIN as f64 && value <= i64::MAX as f64).then_some(value as i64)
    }
}

impl FieldValue for u64 {
    fn accepts(encoding: ValueEncoding) -> bool {
        encoding == ValueEncoding::Unsigned
    }

    fn decode(merged: &Merged) -> Option<Self> {
        let Merged::Number(value) = merged else {
            return None;
        };
        let value = value.round();
        (value >= 0.0 && value <= u64::MAX as f64).then_some(value as u64)
    }
}

/// A sample at `end` covers the preceding step, clipped to the query window.
fn interval_start(window: &QueryWindow, end: DateTime<Utc>) -> DateTime<Utc> {
    (end - window.step_delta()).max(window.start).min(end)
}
