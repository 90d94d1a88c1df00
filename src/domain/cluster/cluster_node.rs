use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A ready cluster node as seen by one collection cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterNode {
    pub name: String,
    /// Cloud provider identifier (`spec.providerID`). Empty on some bare-metal setups.
    pub provider_id: String,
    pub hostname: Option<String>,
    pub labels: BTreeMap<String, String>,
}

impl ClusterNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = provider_id.into();
        self
    }

    pub fn has_provider_id(&self) -> bool {
        !self.provider_id.trim().is_empty()
    }

    pub fn hostname_or_name(&self) -> &str {
        self.hostname.as_deref().unwrap_or(&self.name)
    }
}
