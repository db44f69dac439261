pub mod lazy;

use std::ops::Deref;
use std::sync::Arc;

use futures::FutureExt;

use crate::error::Result;
use crate::forge::types::{Comment, Commit, Issue, PullRequest, Repo, Review, Status, TimelineEvent};
use crate::forge::Forge;

pub use lazy::Lazy;

/// An issue as handed to the rule engine: the raw record plus auxiliary
/// forge data that is only fetched when a rule reads it.
pub struct IssueFacade {
    issue: Issue,
    repo: Arc<Repo>,
    full_name: String,
    timeline: Lazy<Vec<TimelineEvent>>,
    comments: Lazy<Vec<Comment>>,
    pull_request_info: Arc<Lazy<Option<PullRequest>>>,
    pull_request_commits: Lazy<Vec<Commit>>,
    pull_request_reviews: Lazy<Vec<Review>>,
    pull_request_statuses: Lazy<Vec<Status>>,
}

impl IssueFacade {
    pub fn new(forge: Arc<dyn Forge>, owner: &str, repo: Arc<Repo>, issue: Issue) -> Self {
        let owner = owner.to_string();
        let name = repo.name.clone();
        let number = issue.number;
        let full_name = format!("{owner}/{name}#{number}");

        let timeline = {
            let (forge, owner, name) = (Arc::clone(&forge), owner.clone(), name.clone());
            Lazy::new(move || {
                let (forge, owner, name) = (Arc::clone(&forge), owner.clone(), name.clone());
                async move { forge.get_events_for_issue(&owner, &name, number).await }.boxed()
            })
        };

        let comments = {
            let (forge, owner, name) = (Arc::clone(&forge), owner.clone(), name.clone());
            Lazy::new(move || {
                let (forge, owner, name) = (Arc::clone(&forge), owner.clone(), name.clone());
                async move { forge.get_comments_for_issue(&owner, &name, number).await }.boxed()
            })
        };

        if !issue.is_pull_request() {
            return Self {
                issue,
                repo,
                full_name,
                timeline,
                comments,
                pull_request_info: Arc::new(Lazy::resolved(None)),
                pull_request_commits: Lazy::resolved(Vec::new()),
                pull_request_reviews: Lazy::resolved(Vec::new()),
                pull_request_statuses: Lazy::resolved(Vec::new()),
            };
        }

        let pull_request_info = {
            let (forge, owner, name) = (Arc::clone(&forge), owner.clone(), name.clone());
            Arc::new(Lazy::new(move || {
                let (forge, owner, name) = (Arc::clone(&forge), owner.clone(), name.clone());
                async move { forge.get_pull_request(&owner, &name, number).await.map(Some) }
                    .boxed()
            }))
        };

        let pull_request_commits = {
            let (forge, owner, name) = (Arc::clone(&forge), owner.clone(), name.clone());
            Lazy::new(move || {
                let (forge, owner, name) = (Arc::clone(&forge), owner.clone(), name.clone());
                async move {
                    forge
                        .get_commits_for_pull_request(&owner, &name, number)
                        .await
                }
                .boxed()
            })
        };

        let pull_request_reviews = {
            let (forge, owner, name) = (Arc::clone(&forge), owner.clone(), name.clone());
            Lazy::new(move || {
                let (forge, owner, name) = (Arc::clone(&forge), owner.clone(), name.clone());
                async move {
                    forge
                        .get_reviews_for_pull_request(&owner, &name, number)
                        .await
                }
                .boxed()
            })
        };

        // Statuses hang off the head commit, so they go through the shared info field.
        let pull_request_statuses = {
            let info = Arc::clone(&pull_request_info);
            Lazy::new(move || {
                let (forge, owner, name, info) = (
                    Arc::clone(&forge),
                    owner.clone(),
                    name.clone(),
                    Arc::clone(&info),
                );
                async move { head_statuses(forge.as_ref(), &owner, &name, &info).await }
                .boxed()
            })
        };

        Self {
            issue,
            repo,
            full_name,
            timeline,
            comments,
            pull_request_info,
            pull_request_commits,
            pull_request_reviews,
            pull_request_statuses,
        }
    }

    pub fn issue(&self) -> &Issue {
        &self.issue
    }

    pub fn repo(&self) -> &Repo {
        &self.repo
    }

    /// `owner/repo#number`
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub async fn timeline(&self) -> Result<&[TimelineEvent]> {
        self.timeline.get().await.map(Vec::as_slice)
    }

    pub async fn comments(&self) -> Result<&[Comment]> {
        self.comments.get().await.map(Vec::as_slice)
    }

    /// `None` when the issue is not a pull request.
    pub async fn pull_request_info(&self) -> Result<Option<&PullRequest>> {
        self.pull_request_info.get().await.map(Option::as_ref)
    }

    pub async fn pull_request_commits(&self) -> Result<&[Commit]> {
        self.pull_request_commits.get().await.map(Vec::as_slice)
    }

    pub async fn pull_request_reviews(&self) -> Result<&[Review]> {
        self.pull_request_reviews.get().await.map(Vec::as_slice)
    }

    /// Statuses of the head commit, newest first.
    pub async fn pull_request_statuses(&self) -> Result<&[Status]> {
        self.pull_request_statuses.get().await.map(Vec::as_slice)
    }
}

/// Statuses of a pull request's head commit, newest first.
async fn head_statuses(
    forge: &dyn Forge,
    owner: &str,
    name: &str,
    info: &Lazy<Option<PullRequest>>,
) -> Result<Vec<Status>> {
    let Some(sha) = info.get().await?.as_ref().and_then(PullRequest::head_sha) else {
        return Ok(Vec::new());
    };
    let mut statuses = forge.get_statuses(owner, name, sha).await?;
    statuses.reverse();
    Ok(statuses)
}

impl Deref for IssueFacade {
    type Target = Issue;

    fn deref(&self) -> &Issue {
        &self.issue
    }
}

impl std::fmt::Debug for IssueFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssueFacade")
            .field("full_name", &self.full_name)
            .field("issue", &self.issue)
            .finish_non_exhaustive()
    }
}
