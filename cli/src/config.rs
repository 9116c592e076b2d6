use anyhow::Result;
use common::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

fn default_url() -> String { common::DEFAULT_SERVER_URL.to_string() }
fn default_timeout() -> u64 { 10_000 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_ms: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Where `execute` jobs write their output.
    #[serde(default = "default_dump_dir")]
    pub dump_dir: PathBuf,
}

fn default_poll_interval() -> u64 { 5_000 }
fn default_dump_dir() -> PathBuf { std::env::temp_dir() }

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            dump_dir: default_dump_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        common::config::load_or_default(path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.worker.poll_interval_ms)
    }
}
