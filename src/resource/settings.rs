use serde::{Deserialize, Serialize};

use crate::resource::constants::DEFAULT_REGISTRY_NAME;

/// Construction-time settings for a [`ResourceRegistry`](crate::resource::ResourceRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistrySettings {
    /// Label used in log messages. Defaults to `[DEFAULT]`.
    pub name: Option<String>,
    /// Run teardown when the registry is dropped with live providers left.
    pub destroy_on_drop: bool,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            name: None,
            destroy_on_drop: true,
        }
    }
}

impl RegistrySettings {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_destroy_on_drop(mut self, enabled: bool) -> Self {
        self.destroy_on_drop = enabled;
        self
    }

    pub(crate) fn resolved_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_REGISTRY_NAME)
    }
}
