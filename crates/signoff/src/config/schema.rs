use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub version: String,
    /// Per-document signer timeout.
    #[serde(default = "default_sign_timeout_secs")]
    pub sign_timeout_secs: u64,
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_sign_timeout_secs() -> u64 {
    30
}

fn default_broadcast_capacity() -> usize {
    256
}

impl EngineConfig {
    pub fn sign_timeout(&self) -> Duration {
        Duration::from_secs(self.sign_timeout_secs)
    }

    /// Configured database path, or `~/.signoff/data/signoff.db`.
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        self.database_path
            .clone()
            .or_else(crate::db::default_database_path)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            sign_timeout_secs: default_sign_timeout_secs(),
            broadcast_capacity: default_broadcast_capacity(),
            database_path: None,
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}
