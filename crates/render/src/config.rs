use std::path::Path;

use lumen_common::Capabilities;
use serde::{Deserialize, Serialize};

/// Errors from loading a render configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Queue sizing and transparency handling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Slots each bucket starts with.
    pub initial_capacity: usize,
    /// Draw two-pass transparent objects back faces first.
    pub two_pass_transparency: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 32,
            two_pass_transparency: true,
        }
    }
}

/// Everything needed to set up a context and its queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub queue: QueueConfig,
    pub capabilities: Capabilities,
}

impl RenderConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml_str(&text)?;
        tracing::debug!(path = %path.as_ref().display(), "render config loaded");
        Ok(config)
    }
}
