/// Kubernetes types used by node discovery, re-exported from k8s-openapi.

pub use k8s_openapi::api::core::v1::{Node, NodeAddress, NodeCondition, NodeSpec, NodeStatus};

pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
