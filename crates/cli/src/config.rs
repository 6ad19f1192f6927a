//! CLI configuration management

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub cli: CliSettings,
    #[serde(default)]
    pub tool: ToolSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliSettings {
    /// Default log level when RUST_LOG and --log-level are unset
    #[serde(default = "CliSettings::default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Executable name (or path) of the usbipd tool
    #[serde(default = "ToolSettings::default_program")]
    pub program: String,
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

impl CliSettings {
    fn default_log_level() -> String {
        "warn".to_string()
    }
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            program: Self::default_program(),
        }
    }
}

impl ToolSettings {
    fn default_program() -> String {
        usbipd::PROGRAM.to_string()
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            cli: CliSettings::default(),
            tool: ToolSettings::default(),
        }
    }
}

impl CliConfig {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => {
                let default = Self::default_path();
                if !default.exists() {
                    return Err(anyhow!("No configuration file found, using defaults"));
                }
                default
            }
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: CliConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::debug!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("wsl-usb").join("config.toml")
        } else {
            PathBuf::from(".config/wsl-usb/config.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.cli.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.cli.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.tool.program.trim().is_empty() {
            return Err(anyhow!("Tool program name must not be empty"));
        }

        Ok(())
    }
}
