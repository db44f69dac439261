use std::sync::Arc;

use base64::Engine;
use serde_yaml::{Mapping, Value};

use crate::engine::{RuleEngine, RunContext};
use crate::error::{AppError, Result, SettingsError};
use crate::facade::IssueFacade;
use crate::forge::Forge;

/// Location of the per-repository settings file on the default branch.
pub const SETTINGS_PATH: &str = "/open-bot.yaml";

/// Validated rule configuration of one repository.
pub struct RepoConfig {
    bot: String,
    settings: Mapping,
    engine: Arc<dyn RuleEngine>,
}

impl RepoConfig {
    /// Build a config from a parsed settings document. The document must be
    /// a mapping with a string `bot` field; everything else belongs to the
    /// rule engine.
    pub fn from_value(
        value: Value,
        engine: Arc<dyn RuleEngine>,
    ) -> std::result::Result<Self, SettingsError> {
        let Value::Mapping(settings) = value else {
            return Err(SettingsError::Invalid(
                "settings must be a mapping".to_string(),
            ));
        };

        let bot = match settings.get("bot") {
            Some(Value::String(bot)) if !bot.is_empty() => bot.clone(),
            Some(_) => {
                return Err(SettingsError::Invalid(
                    "`bot` must be a non-empty string".to_string(),
                ))
            }
            None => return Err(SettingsError::Invalid("missing `bot` field".to_string())),
        };

        engine.validate(&settings).map_err(SettingsError::Invalid)?;

        Ok(Self {
            bot,
            settings,
            engine,
        })
    }

    /// Account this configuration was written for.
    pub fn bot(&self) -> &str {
        &self.bot
    }

    pub fn settings(&self) -> &Mapping {
        &self.settings
    }

    pub fn is_for(&self, bot_username: &str) -> bool {
        self.bot == bot_username
    }

    /// Refuse to act on a repository configured for another bot account.
    pub fn ensure_bot(&self, repo_full_name: &str, bot_username: &str) -> Result<()> {
        if self.is_for(bot_username) {
            Ok(())
        } else {
            Err(AppError::DifferentBot {
                repo: repo_full_name.to_string(),
                expected: self.bot.clone(),
                actual: bot_username.to_string(),
            })
        }
    }

    pub async fn run(&self, ctx: &mut RunContext, issue: &IssueFacade) -> Result<()> {
        self.engine.run(self, ctx, issue).await
    }
}

impl std::fmt::Debug for RepoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoConfig")
            .field("bot", &self.bot)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Resolves the `RepoConfig` of a repository.
pub struct ConfigLoader {
    forge: Arc<dyn Forge>,
    engine: Arc<dyn RuleEngine>,
    override_settings: Option<Value>,
}

impl ConfigLoader {
    pub fn new(forge: Arc<dyn Forge>, engine: Arc<dyn RuleEngine>) -> Self {
        Self {
            forge,
            engine,
            override_settings: None,
        }
    }

    /// Use one settings document for every repository instead of fetching it.
    pub fn with_override(mut self, settings: Option<Value>) -> Self {
        self.override_settings = settings;
        self
    }

    pub async fn get_config(&self, owner: &str, repo: &str) -> Result<Arc<RepoConfig>> {
        self.load(owner, repo)
            .await
            .map(Arc::new)
            .map_err(|source| {
                tracing::debug!(owner = %owner, repo = %repo, error = %source, "Settings unavailable");
                AppError::Settings {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                    source,
                }
            })
    }

    async fn load(&self, owner: &str, repo: &str) -> std::result::Result<RepoConfig, SettingsError> {
        if let Some(settings) = &self.override_settings {
            return RepoConfig::from_value(settings.clone(), Arc::clone(&self.engine));
        }

        let content = self
            .forge
            .get_blob(owner, repo, SETTINGS_PATH)
            .await
            .map_err(|e| SettingsError::Fetch(Box::new(e)))?;

        let value = decode_settings(&content)?;
        RepoConfig::from_value(value, Arc::clone(&self.engine))
    }
}

/// Decode a base64 blob payload and parse it as YAML.
pub fn decode_settings(content: &str) -> std::result::Result<Value, SettingsError> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD.decode(compact)?;
    let text = String::from_utf8(bytes)?;
    Ok(serde_yaml::from_str(&text)?)
}
