//! Router configuration, loadable from TOML.

use std::collections::HashSet;

use serde::Deserialize;

use hr_catalog::{CatalogError, Intent};
use hr_classify::{LlmConfig, RoutingConfig};

/// Top-level configuration for a `Router`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouterConfig {
    /// Strategy and thresholds; `preset` picks a base, other keys override it.
    #[serde(default)]
    pub routing: RoutingConfig,
    /// Local model server. Unused when `routing.llm_enabled` is false.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Custom intents; a name matching a built-in intent replaces it.
    #[serde(default)]
    pub intents: Vec<Intent>,
}

impl RouterConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Routing thresholds in range, and no custom intent named twice.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.routing.validate()?;
        let mut seen = HashSet::new();
        for intent in &self.intents {
            if !seen.insert(intent.name.as_str()) {
                return Err(CatalogError::DuplicateIntent(intent.name.clone()).into());
            }
        }
        Ok(())
    }
}
