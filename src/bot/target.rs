use std::str::FromStr;
use std::sync::Arc;

use crate::bot::item::{IssueWorkItem, RepoWorkItem, WorkItem};
use crate::error::{AppError, Result};
use crate::forge::Forge;

/// What the operator asked to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Every repository of an organization or user.
    Org(String),
    Repo { owner: String, repo: String },
    Issue { owner: String, repo: String, number: u64 },
}

impl FromStr for Target {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || AppError::InvalidTarget(s.to_string());
        let valid_segment = |seg: &str| {
            !seg.is_empty() && !seg.contains(char::is_whitespace) && !seg.contains('/')
        };

        let (path, number) = match s.split_once('#') {
            Some((path, number)) => (path, Some(number.parse::<u64>().map_err(|_| invalid())?)),
            None => (s, None),
        };

        match (path.split_once('/'), number) {
            (None, None) if valid_segment(path) => Ok(Target::Org(path.to_string())),
            (Some((owner, repo)), None) if valid_segment(owner) && valid_segment(repo) => {
                Ok(Target::Repo {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                })
            }
            (Some((owner, repo)), Some(number)) if valid_segment(owner) && valid_segment(repo) => {
                Ok(Target::Issue {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                    number,
                })
            }
            _ => Err(invalid()),
        }
    }
}

/// Expand targets into work items, in the order given.
pub async fn resolve_targets(forge: &dyn Forge, targets: &[Target]) -> Result<Vec<WorkItem>> {
    let mut items = Vec::new();

    for target in targets {
        match target {
            Target::Org(org) => {
                let repos = forge.get_repos_of_org(org).await?;
                tracing::info!(org = %org, count = repos.len(), "Listed repositories");
                items.extend(
                    repos
                        .into_iter()
                        .filter(|repo| !repo.archived)
                        .map(|repo| RepoWorkItem::new(Arc::new(repo)).into()),
                );
            }
            Target::Repo { owner, repo } => {
                let repo = forge.get_repo(owner, repo).await?;
                items.push(RepoWorkItem::new(Arc::new(repo)).into());
            }
            Target::Issue {
                owner,
                repo,
                number,
            } => {
                let (repo, issue) =
                    tokio::try_join!(forge.get_repo(owner, repo), forge.get_issue(owner, repo, *number))?;
                items.push(IssueWorkItem::new(Arc::new(repo), issue).into());
            }
        }
    }

    Ok(items)
}
