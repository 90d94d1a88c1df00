use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Keeps node names usable as file name components.
fn file_component(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect()
}

pub fn sample_cycle_dir_path(root: &Path, cycle_id: Uuid) -> PathBuf {
    root.join(format!("cycle-{cycle_id}"))
}

pub fn sample_node_file_path(cycle_dir: &Path, node: &str) -> PathBuf {
    cycle_dir.join(format!("node_{}.json", file_component(node)))
}

pub fn sample_pods_file_path(cycle_dir: &Path, node: &str) -> PathBuf {
    cycle_dir.join(format!("pods_{}.json", file_component(node)))
}

pub fn sample_cycle_file_path(cycle_dir: &Path) -> PathBuf {
    cycle_dir.join("cycle.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_names_are_flattened_into_one_component() {
        let dir = Path::new("/tmp/samples");
        assert_eq!(
            sample_node_file_path(dir, "ip-10-0-0-1.ec2.internal"),
            PathBuf::from("/tmp/samples/node_ip-10-0-0-1.ec2.internal.json")
        );
        assert_eq!(
            sample_pods_file_path(dir, "../etc/passwd"),
            PathBuf::from("/tmp/samples/pods_.._etc_passwd.json")
        );
    }
}
