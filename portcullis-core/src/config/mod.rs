//! Configuration system for Portcullis
//!
//! Configuration values are resolved in the following order (highest priority wins):
//!
//! 1. **Code** ([`Http2ServerBuilder`](crate::server::Http2ServerBuilder)) - Highest priority
//! 2. **Environment Variables** (`PORTCULLIS_*`) - Override file config
//! 3. **Config File** (`portcullis.toml`) - Override defaults
//! 4. **Defaults** - Lowest priority
//!
//! # Example
//!
//! ```no_run
//! use portcullis_core::config::PortcullisConfig;
//!
//! let config = PortcullisConfig::load()?;
//! config.validate()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod logging;
pub mod server;

pub use logging::LoggingConfig;
pub use server::ServerConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file looked up by [`PortcullisConfig::load`]
pub const DEFAULT_CONFIG_FILE: &str = "portcullis.toml";

/// Complete Portcullis configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortcullisConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl PortcullisConfig {
    /// Load with full supersedence: defaults, then `portcullis.toml`, then env
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific file; a missing file is not an error
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut config = Self::default();

        if path.exists() {
            let file_config = Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.merge(file_config);
        }

        config.apply_env_vars();

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.as_ref().display()))
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.server.merge(other.server);
        self.logging.merge(other.logging);
    }

    pub fn apply_env_vars(&mut self) {
        self.server.apply_env_vars();
        self.logging.apply_env_vars();
    }

    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
