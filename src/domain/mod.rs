pub mod cluster;
pub mod metric;
