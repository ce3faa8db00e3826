//! Bridge configuration, loaded from TOML.
//!
//! ```toml
//! default_script = "glirc.lua"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

use crate::logging::LogConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// File name looked up next to the extension library when no script is given.
pub const DEFAULT_SCRIPT_NAME: &str = "glirc.lua";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Script file name used when the host passes no arguments.
    pub default_script: String,
    pub logging: LogConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            default_script: DEFAULT_SCRIPT_NAME.to_string(),
            logging: LogConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("default_script must be a bare file name, got {0:?}")]
    InvalidScriptName(String),
}

impl BridgeConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let name = self.default_script.as_str();
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            return Err(ConfigError::InvalidScriptName(name.to_string()));
        }
        Ok(())
    }
}
