// Configuration management module
// Handles loading, saving, and validating configuration

use crate::scrobbler::ClientInfo;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Account credentials and the scrobbling toggle
    #[serde(default)]
    pub account: AccountConfig,

    /// Submission service endpoint and client identification
    #[serde(default)]
    pub service: ServiceConfig,

    /// Text cleanup configuration
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Whether scrobbling is enabled
    pub enabled: bool,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Handshake endpoint
    pub handshake_url: String,

    /// Submission protocol version sent in the handshake
    pub protocol_version: String,

    /// Client identifier and version sent in the handshake
    pub client_id: String,
    pub client_version: String,

    /// HTTP request timeout in seconds
    pub request_timeout: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            handshake_url: "http://post.audioscrobbler.com/".to_string(),
            protocol_version: "1.2.1".to_string(),
            client_id: "adl".to_string(),
            client_version: "0.1".to_string(),
            request_timeout: 10,
        }
    }
}

impl ServiceConfig {
    pub fn client_info(&self) -> ClientInfo {
        ClientInfo {
            handshake_url: self.handshake_url.clone(),
            protocol_version: self.protocol_version.clone(),
            client_id: self.client_id.clone(),
            client_version: self.client_version.clone(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Enable text cleanup
    pub enabled: bool,

    /// Regex patterns removed from artist, title and album, in order
    pub patterns: Vec<String>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            patterns: vec![
                r"\s*\[Explicit\]".to_string(),
                r"\s*\[Clean\]".to_string(),
                r"\s*\(Explicit\)".to_string(),
                r"\s*\(Clean\)".to_string(),
                r"\s*- Explicit".to_string(),
                r"\s*- Clean".to_string(),
            ],
        }
    }
}

impl Config {
    /// Get the path to the default configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;

        Ok(config_dir.join("audioscrobbler_client.conf"))
    }

    /// Load the default configuration file, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, or create a default file there
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("Config file not found, creating default at {:?}", path);
            let default_config = Self::default();
            default_config.save_to(path)?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content).context("Failed to write config file")?;

        log::info!("Config saved to {:?}", path);

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.service.request_timeout == 0 {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        if self.service.handshake_url.is_empty() {
            anyhow::bail!("handshake_url is required");
        }

        if self.service.client_id.is_empty() {
            anyhow::bail!("client_id is required");
        }

        if !self.account.enabled {
            log::warn!("Scrobbling is disabled");
            return Ok(());
        }

        if self.account.username.is_empty() {
            anyhow::bail!("username is required when scrobbling is enabled");
        }
        if self.account.password.is_empty() {
            anyhow::bail!("password is required when scrobbling is enabled");
        }

        Ok(())
    }

    /// The configuration as TOML with the password masked
    pub fn redacted(&self) -> Result<String> {
        let mut shown = self.clone();
        if !shown.account.password.is_empty() {
            shown.account.password = "********".to_string();
        }
        toml::to_string_pretty(&shown).context("Failed to serialize config")
    }
}
