use async_trait::async_trait;
use kube::api::ListParams;
use kube::{Api, Client};
use tracing::debug;

use crate::core::client::kube_resources::Node;
use crate::core::client::mappers::map_node_to_cluster_node;
use crate::domain::cluster::cluster_node::ClusterNode;
use crate::errors::NodeSourceError;

/// Supplies the nodes a collection cycle should query.
#[async_trait]
pub trait NodeSource: Send + Sync {
    async fn get_ready_nodes(&self) -> Result<Vec<ClusterNode>, NodeSourceError>;
}

/// Node source backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeNodeSource {
    client: Client,
}

impl KubeNodeSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NodeSource for KubeNodeSource {
    async fn get_ready_nodes(&self) -> Result<Vec<ClusterNode>, NodeSourceError> {
        let nodes = fetch_nodes(&self.client).await?;
        let total = nodes.len();
        let ready: Vec<ClusterNode> = nodes
            .iter()
            .filter(|n| is_node_ready(n))
            .filter_map(map_node_to_cluster_node)
            .collect();

        debug!("Discovered {} ready node(s) out of {}", ready.len(), total);
        Ok(ready)
    }
}

/// Fetch all nodes in the cluster
pub async fn fetch_nodes(client: &Client) -> Result<Vec<Node>, kube::Error> {
    let nodes: Api<Node> = Api::all(client.clone());
    let node_list = nodes.list(&ListParams::default()).await?;
    Ok(node_list.items)
}

/// A node is ready when its `Ready` condition reports `True`.
pub fn is_node_ready(node: &Node) -> bool {
    node.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .and_then(|conds| conds.iter().find(|c| c.type_ == "Ready"))
        .is_some_and(|c| c.status == "True")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::kube_resources::{NodeCondition, NodeStatus, ObjectMeta};

    fn node_with_ready(status: Option<&str>) -> Node {
        Node {
            metadata: ObjectMeta {
                name: Some("node-a".into()),
                ..Default::default()
            },
            status: Some(NodeStatus {
                conditions: status.map(|s| {
                    vec![
                        NodeCondition {
                            type_: "MemoryPressure".into(),
                            status: "False".into(),
                            ..Default::default()
                        },
                        NodeCondition {
                            type_: "Ready".into(),
                            status: s.into(),
                            ..Default::default()
                        },
                    ]
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn ready_condition_decides_readiness() {
        assert!(is_node_ready(&node_with_ready(Some("True"))));
        assert!(!is_node_ready(&node_with_ready(Some("False"))));
        assert!(!is_node_ready(&node_with_ready(Some("Unknown"))));
        assert!(!is_node_ready(&node_with_ready(None)));
        assert!(!is_node_ready(&Node::default()));
    }
}
