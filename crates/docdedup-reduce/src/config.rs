//! Deduplication settings, loadable from TOML or JSON

use crate::error::DedupError;
use crate::gc::GcConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for a deduplication run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Include decoded stream payloads in fingerprints
    pub aggressive: bool,
    /// Garbage collector settings
    pub gc: GcConfig,
    /// Default tracing filter directive for binaries
    pub log_level: String,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            aggressive: true,
            gc: GcConfig::default(),
            log_level: String::from("info"),
        }
    }
}

impl DedupConfig {
    /// Load from a `.toml` or `.json` file, chosen by extension.
    pub fn from_file(path: &Path) -> Result<Self, DedupError> {
        let contents = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        match ext.to_lowercase().as_str() {
            "toml" => toml::from_str(&contents).map_err(|e| DedupError::Config(e.to_string())),
            "json" => serde_json::from_str(&contents).map_err(|e| DedupError::Config(e.to_string())),
            _ => Err(DedupError::Config(format!(
                "Unsupported config file extension: {}",
                ext
            ))),
        }
    }
}
