use std::sync::Arc;

use crate::forge::types::{Issue, Repo};
use crate::settings::RepoConfig;

/// A single issue that is already known.
#[derive(Debug, Clone)]
pub struct IssueWorkItem {
    pub repo: Arc<Repo>,
    pub owner: String,
    pub repo_name: String,
    pub issue: Issue,
    full_name: String,
}

impl IssueWorkItem {
    pub fn new(repo: Arc<Repo>, issue: Issue) -> Self {
        let owner = repo.owner.login.clone();
        let repo_name = repo.name.clone();
        let full_name = format!("{owner}/{repo_name}#{}", issue.number);
        Self {
            repo,
            owner,
            repo_name,
            issue,
            full_name,
        }
    }
}

/// A repository whose open issues still have to be listed.
#[derive(Debug, Clone)]
pub struct RepoWorkItem {
    pub repo: Arc<Repo>,
    full_name: String,
}

impl RepoWorkItem {
    pub fn new(repo: Arc<Repo>) -> Self {
        let full_name = repo.full_name.clone();
        Self { repo, full_name }
    }
}

#[derive(Debug, Clone)]
pub enum WorkItem {
    Issue(IssueWorkItem),
    Repo(RepoWorkItem),
}

impl WorkItem {
    /// Stable identifier used in reports; fixed when the item is created.
    pub fn full_name(&self) -> &str {
        match self {
            WorkItem::Issue(item) => &item.full_name,
            WorkItem::Repo(item) => &item.full_name,
        }
    }
}

impl From<IssueWorkItem> for WorkItem {
    fn from(item: IssueWorkItem) -> Self {
        WorkItem::Issue(item)
    }
}

impl From<RepoWorkItem> for WorkItem {
    fn from(item: RepoWorkItem) -> Self {
        WorkItem::Repo(item)
    }
}

/// An issue paired with the configuration and repository it is processed under.
pub struct Triple {
    pub config: Arc<RepoConfig>,
    pub repo: Arc<Repo>,
    pub issue: Issue,
    full_name: String,
}

impl Triple {
    pub fn new(config: Arc<RepoConfig>, repo: Arc<Repo>, issue: Issue) -> Self {
        let full_name = format!("{}/{}#{}", repo.owner.login, repo.name, issue.number);
        Self {
            config,
            repo,
            issue,
            full_name,
        }
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }
}
