use anyhow::Result;
use common::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String { common::DEFAULT_LISTEN_ADDR.to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf { PathBuf::from(common::DEFAULT_DB_PATH) }
fn default_connect_attempts() -> u32 { 3 }
fn default_retry_delay() -> u64 { 1000 }
fn default_busy_timeout() -> u64 { 5000 }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            connect_attempts: default_connect_attempts(),
            retry_delay_ms: default_retry_delay(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load from a `.yaml`/`.yml`/`.toml` file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        common::config::load_or_default(path)
    }

    /// Apply command-line overrides on top of file values.
    pub fn merge_overrides(&mut self, listen: Option<String>, db: Option<PathBuf>) {
        if let Some(listen) = listen {
            self.server.listen = listen;
        }
        if let Some(db) = db {
            self.store.path = db;
        }
    }
}
