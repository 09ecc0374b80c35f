//! Configuration types for the stake server.
//!
//! Loaded from `~/.config/stake/config.toml` (or `$STAKE_CONFIG`), every
//! section optional. The `PORT` environment variable overrides the listen
//! port.

use serde::{Deserialize, Serialize};
use stake_scout::ScoutConfig;
use std::path::{Path, PathBuf};

use crate::error::{Result, StakeError};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "STAKE_CONFIG";

/// Environment variable overriding [`ServerConfig::port`].
pub const PORT_ENV: &str = "PORT";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StakeConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Quote sources and renderer settings.
    pub scout: ScoutConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to (`0` = auto-assign).
    pub port: u16,
    /// Origins allowed by CORS.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3001,
            allowed_origins: vec!["http://localhost:5173".to_owned()],
        }
    }
}

impl StakeConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| StakeError::Config(format!("{}: {e}", path.display())))
    }

    /// Returns the default config file path: `~/.config/stake/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("stake").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("stake")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/stake-config/config.toml")
        }
    }

    /// Load configuration the way the server does at startup.
    ///
    /// Reads `$STAKE_CONFIG` if set, else the default path if it exists, else
    /// uses defaults; then applies `$PORT`.
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen file is unreadable or invalid, or if
    /// `$PORT` is not a port number.
    pub fn load() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// [`StakeConfig::load`] with an injectable environment lookup.
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match env(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => {
                let path = Self::default_config_path();
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };

        if let Some(port) = env(PORT_ENV) {
            config.server.port = port
                .trim()
                .parse()
                .map_err(|_| StakeError::Config(format!("{PORT_ENV} is not a port: {port:?}")))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns [`StakeError::Config`] for an empty host or origin, and
    /// forwards scout validation failures.
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(StakeError::Config("server.host must not be empty".into()));
        }
        if self.server.allowed_origins.iter().any(|o| o.trim().is_empty()) {
            return Err(StakeError::Config(
                "server.allowed_origins must not contain empty entries".into(),
            ));
        }
        self.scout.validate()?;
        Ok(())
    }
}
