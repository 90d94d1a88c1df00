// Kubernetes node discovery
pub mod kube_client;
pub mod kube_resources;
pub mod mappers;
pub mod nodes;

// Prometheus-compatible metrics backend
pub mod probe;
pub mod prometheus_client;
pub mod prometheus_dto;
