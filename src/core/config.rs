//! Host configuration (`aion.yaml`).
//!
//! Declares extra model providers, the run event log location, and CLI
//! display settings. Every field is optional.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default name of the host configuration file.
pub const CONFIG_FILE: &str = "aion.yaml";

/// Parsed `aion.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AionConfig {
    /// Model providers backed by external commands
    #[serde(default)]
    pub providers: IndexMap<String, ProviderConfig>,

    /// JSONL run audit log
    #[serde(default)]
    pub event_log: Option<PathBuf>,

    /// Rows shown in the CLI result preview
    #[serde(default = "default_head_rows")]
    pub head_rows: usize,
}

impl Default for AionConfig {
    fn default() -> Self {
        Self {
            providers: IndexMap::new(),
            event_log: None,
            head_rows: default_head_rows(),
        }
    }
}

fn default_head_rows() -> usize {
    5
}

/// An external command acting as a model provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Load and parse a config file from disk.
pub fn load_config(path: &Path) -> Result<AionConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    parse_config(&content)
}

/// Parse config YAML. An empty document yields the defaults.
pub fn parse_config(yaml: &str) -> Result<AionConfig, String> {
    if yaml.trim().is_empty() {
        return Ok(AionConfig::default());
    }
    serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))
}

/// Semantic checks that serde cannot express. Empty = valid.
pub fn validate_config(config: &AionConfig) -> Vec<String> {
    let mut errors = Vec::new();
    for (name, provider) in &config.providers {
        if name == "simulate" {
            errors.push("provider 'simulate' is built in and cannot be redefined".to_string());
        }
        if provider.command.trim().is_empty() {
            errors.push(format!("provider '{}' has an empty command", name));
        }
    }
    if config.head_rows == 0 {
        errors.push("head_rows must be at least 1".to_string());
    }
    errors
}
