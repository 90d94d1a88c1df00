/// Maps k8s-openapi types → internal domain models
use crate::core::client::kube_resources::Node;
use crate::domain::cluster::cluster_node::ClusterNode;

/// Converts a k8s-openapi Node into a ClusterNode. Nodes without a name are skipped.
pub fn map_node_to_cluster_node(node: &Node) -> Option<ClusterNode> {
    let metadata = &node.metadata;
    let name = metadata.name.clone()?;

    let provider_id = node
        .spec
        .as_ref()
        .and_then(|s| s.provider_id.clone())
        .unwrap_or_default();

    let hostname = node
        .status
        .as_ref()
        .and_then(|s| s.addresses.as_ref())
        .and_then(|addresses| addresses.iter().find(|a| a.type_ == "Hostname"))
        .map(|a| a.address.clone());

    Some(ClusterNode {
        name,
        provider_id,
        hostname,
        labels: metadata.labels.clone().unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::kube_resources::{NodeAddress, NodeSpec, NodeStatus, ObjectMeta};
    use std::collections::BTreeMap;

    #[test]
    fn maps_provider_hostname_and_labels() {
        let node = Node {
            metadata: ObjectMeta {
                name: Some("ip-10-0-0-1".into()),
                labels: Some(BTreeMap::from([(
                    "topology.kubernetes.io/zone".to_string(),
                    "us-east-1a".to_string(),
                )])),
                ..Default::default()
            },
            spec: Some(NodeSpec {
                provider_id: Some("aws:///us-east-1a/i-0abc".into()),
                ..Default::default()
            }),
            status: Some(NodeStatus {
                addresses: Some(vec![
                    NodeAddress {
                        type_: "InternalIP".into(),
                        address: "10.0.0.1".into(),
                    },
                    NodeAddress {
                        type_: "Hostname".into(),
                        address: "ip-10-0-0-1.ec2.internal".into(),
                    },
                ]),
                ..Default::default()
            }),
        };

        let mapped = map_node_to_cluster_node(&node).unwrap();
        assert_eq!(mapped.name, "ip-10-0-0-1");
        assert_eq!(mapped.provider_id, "aws:///us-east-1a/i-0abc");
        assert_eq!(mapped.hostname.as_deref(), Some("ip-10-0-0-1.ec2.internal"));
        assert_eq!(mapped.labels["topology.kubernetes.io/zone"], "us-east-1a");
    }

    #[test]
    fn missing_spec_yields_empty_provider_id() {
        let node = Node {
            metadata: ObjectMeta {
                name: Some("bare-metal-1".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let mapped = map_node_to_cluster_node(&node).unwrap();
        assert!(!mapped.has_provider_id());
        assert_eq!(mapped.hostname_or_name(), "bare-metal-1");
    }

    #[test]
    fn unnamed_node_is_skipped() {
        assert!(map_node_to_cluster_node(&Node::default()).is_none());
    }
}
