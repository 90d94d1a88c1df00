pub mod cluster_node;
