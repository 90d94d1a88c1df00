pub mod metric_exporter_trait;
pub mod path;
pub mod sample_dir_fs_adapter;
