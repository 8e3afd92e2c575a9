//! Typed view of `config.toml`.
//!
//! Every field has a default, so a missing file or a missing section is
//! valid. Path fields left unset resolve relative to the data directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PING_TIMEOUT_SECS: u64 = 5;

const NODES_FILENAME: &str = "nodes.json";
const SIGNING_KEY_FILENAME: &str = "signing.key";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid setting: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSection,
    pub storage: StorageSection,
    pub activation: ActivationSection,
    pub tokens: TokenSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub address: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationSection {
    pub ping_timeout_secs: u64,
}

impl Default for ActivationSection {
    fn default() -> Self {
        Self {
            ping_timeout_secs: DEFAULT_PING_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSection {
    pub signing_key_path: Option<PathBuf>,
}

impl Settings {
    /// Load settings from `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::parse(&raw).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    fn parse(raw: &str) -> Result<Self, String> {
        toml::from_str(raw).map_err(|e| e.to_string())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.address.trim().is_empty() {
            return Err(ConfigError::Invalid("server.address is empty".into()));
        }
        if self.activation.ping_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "activation.ping_timeout_secs must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Registry file, defaulting to `<data_dir>/state/nodes.json`.
    pub fn storage_path(&self, data_dir: &Path) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| data_dir.join("state").join(NODES_FILENAME))
    }

    /// Signing key file, defaulting to `<data_dir>/state/signing.key`.
    pub fn signing_key_path(&self, data_dir: &Path) -> PathBuf {
        self.tokens
            .signing_key_path
            .clone()
            .unwrap_or_else(|| data_dir.join("state").join(SIGNING_KEY_FILENAME))
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.activation.ping_timeout_secs)
    }
}
