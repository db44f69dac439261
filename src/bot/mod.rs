pub mod item;
pub mod report;
pub mod target;

use std::sync::Arc;

use crate::engine::RunContext;
use crate::error::Result;
use crate::facade::IssueFacade;
use crate::forge::types::{Issue, Repo};
use crate::forge::Forge;
use crate::queue::{WorkQueue, CONCURRENCY_LIMIT};
use crate::settings::{ConfigLoader, RepoConfig};

use item::{RepoWorkItem, Triple, WorkItem};
use report::{Change, ReportEvent, Reporter};

const FETCH_ACTION: &str = "fetch config and issues";
const PROCESS_ACTION: &str = "process issue";

/// Scans repositories and applies their rule configuration to open issues.
pub struct Bot {
    forge: Arc<dyn Forge>,
    settings: ConfigLoader,
    /// Account this process acts as.
    bot_username: String,
}

impl Bot {
    pub fn new(forge: Arc<dyn Forge>, settings: ConfigLoader, bot_username: impl Into<String>) -> Self {
        Self {
            forge,
            settings,
            bot_username: bot_username.into(),
        }
    }

    pub fn bot_username(&self) -> &str {
        &self.bot_username
    }

    /// Run the rules for every issue reachable from `work_items`.
    ///
    /// Issues are first collected from all items, then processed. A
    /// repository that cannot be scanned is reported and skipped; a failure
    /// while processing an issue fails the whole batch.
    pub async fn process(
        &self,
        work_items: Vec<WorkItem>,
        reporter: Arc<dyn Reporter>,
        simulate: bool,
    ) -> Result<()> {
        let queue = WorkQueue::new(CONCURRENCY_LIMIT);

        for item in &work_items {
            reporter.report(ReportEvent::change(item.full_name(), FETCH_ACTION, Change::Queued));
        }

        let resolved = queue
            .queue_all(work_items, |item| self.resolve(item, reporter.as_ref()))
            .await?;
        let triples: Vec<Triple> = resolved.into_iter().flatten().collect();

        tracing::info!(issues = triples.len(), "Collected issues");

        for triple in &triples {
            reporter.report(ReportEvent::change(triple.full_name(), PROCESS_ACTION, Change::Queued));
        }

        queue
            .queue_all(triples, |triple| {
                self.process_triple(triple, Arc::clone(&reporter), simulate)
            })
            .await?;

        Ok(())
    }

    async fn resolve(&self, item: WorkItem, reporter: &dyn Reporter) -> Result<Vec<Triple>> {
        let name = item.full_name().to_string();
        reporter.report(ReportEvent::change(&name, FETCH_ACTION, Change::Start));

        match item {
            WorkItem::Issue(item) => {
                let config = self.settings.get_config(&item.owner, &item.repo_name).await?;
                Ok(vec![Triple::new(config, item.repo, item.issue)])
            }
            WorkItem::Repo(item) => match self.expand_repo(&item).await {
                Ok(triples) => {
                    reporter.report(ReportEvent::change(&name, FETCH_ACTION, Change::Done));
                    Ok(triples)
                }
                Err(e) => {
                    tracing::warn!(repo = %name, error = %e, "Skipping repository");
                    reporter.report(ReportEvent::error(&name, &e));
                    Ok(Vec::new())
                }
            },
        }
    }

    async fn process_triple(
        &self,
        triple: Triple,
        reporter: Arc<dyn Reporter>,
        simulate: bool,
    ) -> Result<()> {
        let item = triple.full_name().to_string();
        reporter.report(ReportEvent::change(&item, PROCESS_ACTION, Change::Start));

        self.run_rules(
            &triple.config,
            triple.repo,
            triple.issue,
            Arc::clone(&reporter),
            simulate,
        )
        .await?;

        reporter.report(ReportEvent::change(&item, PROCESS_ACTION, Change::Done));
        Ok(())
    }

    async fn expand_repo(&self, item: &RepoWorkItem) -> Result<Vec<Triple>> {
        let owner = &item.repo.owner.login;
        let name = &item.repo.name;

        let config = self.settings.get_config(owner, name).await?;
        config.ensure_bot(&item.repo.full_name, &self.bot_username)?;

        let issues = self.forge.get_issues_for_repo(owner, name).await?;
        tracing::debug!(repo = %item.repo.full_name, issues = issues.len(), "Listed open issues");

        Ok(issues
            .into_iter()
            .map(|issue| Triple::new(Arc::clone(&config), Arc::clone(&item.repo), issue))
            .collect())
    }

    /// Process one issue by number.
    ///
    /// A repository without settings, or with settings for another bot, is
    /// skipped and reported rather than treated as an error.
    pub async fn process_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        reporter: Arc<dyn Reporter>,
        simulate: bool,
    ) -> Result<()> {
        let item = format!("{owner}/{repo}#{number}");

        let config = match self.settings.get_config(owner, repo).await {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(item = %item, error = %e, "No usable settings");
                reporter.report(ReportEvent::action(&item, "skip (no config)"));
                return Ok(());
            }
        };

        if !config.is_for(&self.bot_username) {
            reporter.report(ReportEvent::action(&item, "skip (different bot user)"));
            return Ok(());
        }

        let (repo_record, issue) = tokio::try_join!(
            self.forge.get_repo(owner, repo),
            self.forge.get_issue(owner, repo, number)
        )?;

        self.run_rules(&config, Arc::new(repo_record), issue, reporter, simulate)
            .await
    }

    async fn run_rules(
        &self,
        config: &RepoConfig,
        repo: Arc<Repo>,
        issue: Issue,
        reporter: Arc<dyn Reporter>,
        simulate: bool,
    ) -> Result<()> {
        let owner = repo.owner.login.clone();
        let name = repo.name.clone();
        let facade = IssueFacade::new(Arc::clone(&self.forge), &owner, repo, issue);

        let mut ctx = RunContext {
            owner,
            repo: name,
            item: facade.full_name().to_string(),
            forge: Arc::clone(&self.forge),
            bot_username: self.bot_username.clone(),
            data: serde_json::Map::new(),
            reporter,
            simulate,
        };

        config.run(&mut ctx, &facade).await
    }
}
