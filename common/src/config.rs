use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    pub output: Option<PathBuf>,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            output: None,
        }
    }
}

/// Load a YAML config file
pub fn from_yaml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))
}

/// Load a TOML config file
pub fn from_toml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))
}

/// Detect file type by extension and load
pub fn load_from_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let ext = path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    match ext {
        "yaml" | "yml" => from_yaml_file(path),
        "toml" => from_toml_file(path),
        _ => Err(anyhow::anyhow!("Unsupported config file format. Use .yaml, .yml, or .toml")),
    }
}

/// Load `path` if given, otherwise fall back to defaults.
pub fn load_or_default<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    match path {
        Some(path) => load_from_file(path),
        None => Ok(T::default()),
    }
}
