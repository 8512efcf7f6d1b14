//! Client configuration.
//!
//! Config is stored at `~/.config/inkling/config.toml` and contains:
//! - the fallback backend port for standalone mode
//! - readiness polling and upload confirmation settings
//! - the command used to launch the backend when acting as the host

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::backend::{DEFAULT_BACKEND_PORT, ReadinessPolicy};
use crate::upload::DEFAULT_CONFIRM_MB;

const CONFIG_DIR: &str = "inkling";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend port when no desktop host is present (default: 8000).
    #[serde(default = "default_port")]
    pub default_port: u16,

    /// Delay between readiness probes, in milliseconds (default: 1000).
    #[serde(default = "default_readiness_interval_ms")]
    pub readiness_interval_ms: u64,

    /// Probes before giving up on the backend; 0 waits forever (default: 120).
    #[serde(default = "default_readiness_max_attempts")]
    pub readiness_max_attempts: u32,

    /// Uploads above this size ask for confirmation (default: 5.0).
    #[serde(default = "default_upload_confirm_mb")]
    pub upload_confirm_mb: f64,

    /// Default number of search results (default: 10).
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    /// Backend launch command; the port file path is appended as the last argument.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_command: Option<Vec<String>>,

    /// How long to wait for a launched backend to write its port file (default: 30).
    #[serde(default = "default_port_file_timeout_secs")]
    pub port_file_timeout_secs: u64,
}

fn default_port() -> u16 {
    DEFAULT_BACKEND_PORT
}

fn default_readiness_interval_ms() -> u64 {
    1000
}

fn default_readiness_max_attempts() -> u32 {
    120
}

fn default_upload_confirm_mb() -> f64 {
    DEFAULT_CONFIRM_MB
}

fn default_top_k() -> u32 {
    10
}

fn default_port_file_timeout_secs() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_port: default_port(),
            readiness_interval_ms: default_readiness_interval_ms(),
            readiness_max_attempts: default_readiness_max_attempts(),
            upload_confirm_mb: default_upload_confirm_mb(),
            top_k: default_top_k(),
            backend_command: None,
            port_file_timeout_secs: default_port_file_timeout_secs(),
        }
    }
}

impl ClientConfig {
    /// Load config from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load config from a specific file, using defaults when it is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).context("Failed to read config file")?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save config to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, content).context("Failed to write config file")
    }

    pub fn readiness_policy(&self) -> ReadinessPolicy {
        ReadinessPolicy {
            interval: Duration::from_millis(self.readiness_interval_ms.max(1)),
            max_attempts: Some(self.readiness_max_attempts).filter(|n| *n > 0),
        }
    }

    pub fn port_file_timeout(&self) -> Duration {
        Duration::from_secs(self.port_file_timeout_secs)
    }

    /// Get the config file path.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }
}
