use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub github: GitHubConfig,
    #[serde(default)]
    pub bot: BotConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Deserialize, Clone)]
pub struct GitHubConfig {
    /// Account the bot runs as; repositories configured for another `bot` are refused.
    pub user: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub webhook_secret: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
}

// Manual Debug impl to avoid leaking the token and webhook secret
impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("user", &self.user)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BotConfig {
    /// YAML document applied to every repository instead of its `/open-bot.yaml`.
    #[serde(default)]
    pub override_config: Option<PathBuf>,
    #[serde(default)]
    pub simulate: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // An explicit path must exist; the default `open-bot.*` file is optional
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(config::File::with_name("open-bot").required(false));
        }

        // Environment overrides, e.g. OPEN_BOT__GITHUB__USER
        builder = builder.add_source(
            config::Environment::with_prefix("OPEN_BOT")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))
    }

    pub fn webhook_secret(&self) -> Option<&str> {
        self.github.webhook_secret.as_deref()
    }

    /// Read the override rule configuration, if one is configured.
    pub fn override_settings(&self) -> Result<Option<serde_yaml::Value>> {
        self.bot
            .override_config
            .as_deref()
            .map(read_override)
            .transpose()
    }
}

fn read_override(path: &Path) -> Result<serde_yaml::Value> {
    let text = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&text).map_err(|e| {
        AppError::Config(format!(
            "Invalid override config at {}: {e}",
            path.display()
        ))
    })
}
