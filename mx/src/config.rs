//! Audiomatrix configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main audiomatrix configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device host address (name or IP, optionally with port)
    pub host: String,

    /// Directory holding stored matrix configurations
    #[serde(rename = "configs-path")]
    pub configs_path: PathBuf,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Device connection settings
    pub device: DeviceConfig,

    /// Upload tracking settings
    pub upload: UploadConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: String::new(),
            configs_path: PathBuf::from("mappings"),
            log_level: None,
            device: DeviceConfig::default(),
            upload: UploadConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration before talking to a device
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(eyre::eyre!(
                "Device host not set. Pass --host or set `host` in the config file."
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .audiomatrix.yml
        let local_config = PathBuf::from(".audiomatrix.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/audiomatrix/audiomatrix.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("audiomatrix").join("audiomatrix.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are swallowed; the full load reports them once logging works.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut paths = vec![PathBuf::from(".audiomatrix.yml")];
                if let Some(config_dir) = dirs::config_dir() {
                    paths.push(config_dir.join("audiomatrix").join("audiomatrix.yml"));
                }
                paths
            }
        };

        candidates
            .iter()
            .filter(|path| path.exists())
            .find_map(|path| Self::load_from_file(path).ok())
            .and_then(|config| config.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Device connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// URL scheme used when `host` carries none
    pub scheme: String,

    /// Path of the matrix configuration resource
    #[serde(rename = "matrix-path")]
    pub matrix_path: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            matrix_path: "/api/matrix".to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl DeviceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Upload tracking settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// How often to poll the upload state while waiting
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    /// Give up waiting for an upload after this long
    #[serde(rename = "wait-timeout-ms")]
    pub wait_timeout_ms: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
            wait_timeout_ms: 120_000,
        }
    }
}

impl UploadConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}
