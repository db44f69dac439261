use std::sync::Arc;

use async_trait::async_trait;
use serde_yaml::Mapping;

use crate::bot::report::Reporter;
use crate::error::Result;
use crate::facade::IssueFacade;
use crate::forge::Forge;
use crate::settings::RepoConfig;

/// Everything a rule run gets besides the issue itself.
pub struct RunContext {
    pub owner: String,
    pub repo: String,
    /// `owner/repo#number`
    pub item: String,
    pub forge: Arc<dyn Forge>,
    pub bot_username: String,
    /// Scratch space for the rule engine; starts empty for every issue.
    pub data: serde_json::Map<String, serde_json::Value>,
    pub reporter: Arc<dyn Reporter>,
    /// Compute everything but skip writes to the forge.
    pub simulate: bool,
}

/// Executes a repository's rules against one issue.
#[async_trait]
pub trait RuleEngine: Send + Sync {
    /// Check engine-specific settings when a `RepoConfig` is built.
    fn validate(&self, _settings: &Mapping) -> std::result::Result<(), String> {
        Ok(())
    }

    async fn run(
        &self,
        config: &RepoConfig,
        ctx: &mut RunContext,
        issue: &IssueFacade,
    ) -> Result<()>;
}

/// Engine that only logs what it is handed. Useful for dry runs and for
/// checking which issues a batch would touch.
pub struct LoggingEngine;

#[async_trait]
impl RuleEngine for LoggingEngine {
    fn validate(&self, settings: &Mapping) -> std::result::Result<(), String> {
        match settings.get("rules") {
            None | Some(serde_yaml::Value::Sequence(_)) => Ok(()),
            Some(_) => Err("`rules` must be a list".to_string()),
        }
    }

    async fn run(
        &self,
        config: &RepoConfig,
        ctx: &mut RunContext,
        issue: &IssueFacade,
    ) -> Result<()> {
        let rules = config
            .settings()
            .get("rules")
            .and_then(serde_yaml::Value::as_sequence)
            .map_or(0, Vec::len);

        tracing::info!(
            item = %ctx.item,
            title = %issue.title,
            pull_request = issue.is_pull_request(),
            rules = rules,
            simulate = ctx.simulate,
            "Evaluating issue"
        );

        ctx.data
            .insert("rules".to_string(), serde_json::Value::from(rules));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::report::NoopReporter;
    use crate::forge::types::Repo;
    use crate::testing::{fixtures, MockForge};

    #[tokio::test]
    async fn test_logging_engine_touches_no_forge_data() {
        let forge = Arc::new(MockForge::new());
        let value: serde_yaml::Value =
            serde_yaml::from_str("bot: webpack-bot\nrules:\n  - {}\n  - {}\n").unwrap();
        let config = RepoConfig::from_value(value, Arc::new(LoggingEngine)).unwrap();
        let repo: Arc<Repo> = Arc::new(fixtures::repo("acme", "widgets"));
        let issue = IssueFacade::new(forge.clone(), "acme", repo, fixtures::issue(3));

        let mut ctx = RunContext {
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            item: "acme/widgets#3".to_string(),
            forge: forge.clone(),
            bot_username: "webpack-bot".to_string(),
            data: serde_json::Map::new(),
            reporter: Arc::new(NoopReporter),
            simulate: true,
        };

        config.run(&mut ctx, &issue).await.unwrap();
        assert_eq!(ctx.data.get("rules"), Some(&serde_json::Value::from(2usize)));
        assert_eq!(forge.total_calls(), 0);
    }

    #[test]
    fn test_rules_must_be_list() {
        let value: serde_yaml::Value = serde_yaml::from_str("bot: b\nrules: nope\n").unwrap();
        assert!(RepoConfig::from_value(value, Arc::new(LoggingEngine)).is_err());
    }
}
