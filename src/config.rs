//! Application configuration
//!
//! A single TOML file holds every section. Missing keys fall back to their
//! defaults, so an empty file is a valid configuration. The file lives in the
//! user's config directory unless `JOYREMOTE_CONFIG` points elsewhere.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, Level};

use crate::controller::ControllerSettings;
use crate::motion::{HeadAxisSource, SamplerSettings};
use crate::transport::TransportConfig;

pub const CONFIG_ENV: &str = "JOYREMOTE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// One of trace, debug, info, warn, error
    pub log_level: String,
    /// Read key names from stdin and send them to the robot
    pub keyboard_debug: bool,
    pub controller: ControllerSettings,
    pub sampler: SamplerSettings,
    pub transport: TransportConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            keyboard_debug: false,
            controller: ControllerSettings::default(),
            sampler: SamplerSettings::default(),
            transport: TransportConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn log_level(&self) -> Result<Level, ConfigError> {
        Level::from_str(&self.log_level)
            .map_err(|_| ConfigError::Invalid(format!("unknown log level '{}'", self.log_level)))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.log_level()?;

        let interval = self.controller.collection_interval_ms;
        if !(16..=250).contains(&interval) {
            return Err(invalid(format!(
                "collection_interval_ms must be between 16 and 250, got {}",
                interval
            )));
        }
        if self.controller.event_queue_capacity == 0 {
            return Err(invalid("event_queue_capacity must be positive"));
        }

        let sampler = &self.sampler;
        if !(2..=3).contains(&sampler.precision) {
            return Err(invalid(format!(
                "precision must be 2 or 3, got {}",
                sampler.precision
            )));
        }
        if let Some(dead_zone) = sampler.x_dead_zone {
            if !(0.0..1.0).contains(&dead_zone) {
                return Err(invalid(format!(
                    "x_dead_zone must be in [0, 1), got {}",
                    dead_zone
                )));
            }
        }
        if let HeadAxisSource::OrientationAxes { x, y } = sampler.head_axes {
            if x == y {
                return Err(invalid("head orientation axes must differ"));
            }
        }

        let transport = &self.transport;
        if !(transport.server_address.starts_with("http://")
            || transport.server_address.starts_with("https://"))
        {
            return Err(invalid(format!(
                "server_address must start with http:// or https://, got '{}'",
                transport.server_address
            )));
        }
        if !transport.path.starts_with('/') {
            return Err(invalid(format!(
                "path must start with '/', got '{}'",
                transport.path
            )));
        }
        if transport.queue_capacity == 0 {
            return Err(invalid("queue_capacity must be positive"));
        }
        if transport.timeout_ms == 0 {
            return Err(invalid("timeout_ms must be positive"));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

/// Config file location, `$JOYREMOTE_CONFIG` first
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("joyremote")
        .join("config.toml")
}

/// Writes the default configuration if `path` does not exist yet
pub async fn ensure_default_config(path: &Path) -> Result<(), ConfigError> {
    if tokio::fs::try_exists(path).await? {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let content = AppConfig::default().to_toml_string()?;
    tokio::fs::write(path, content).await?;
    info!("Created default configuration at {}", path.display());
    Ok(())
}
