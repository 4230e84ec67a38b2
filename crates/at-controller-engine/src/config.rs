use std::path::Path;

use at_controller_core::Result;
use serde::{Deserialize, Serialize};

/// Settings shared by every machine a controller runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Component name links and handlers call back into.
    #[serde(default = "default_controller_component")]
    pub controller_component: String,

    /// Viewer prefix for `docs` frames; the encoded document source is appended.
    #[serde(default = "default_docs_viewer_path")]
    pub docs_viewer_path: String,
}

fn default_controller_component() -> String {
    "ATController".to_string()
}

fn default_docs_viewer_path() -> String {
    "/docview?asFrame=true&viewing=true&docs=".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            controller_component: default_controller_component(),
            docs_viewer_path: default_docs_viewer_path(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn with_controller_component(mut self, component: impl Into<String>) -> Self {
        self.controller_component = component.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.controller_component, "ATController");
        assert!(config.docs_viewer_path.ends_with("docs="));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = EngineConfig::from_yaml("controller_component: Tutor\n").unwrap();
        assert_eq!(config.controller_component, "Tutor");
        assert_eq!(config.docs_viewer_path, EngineConfig::default().docs_viewer_path);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "docs_viewer_path: /viewer?src=").unwrap();
        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.docs_viewer_path, "/viewer?src=");
        assert_eq!(config.controller_component, "ATController");
    }
}
