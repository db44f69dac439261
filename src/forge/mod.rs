pub mod github;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use types::*;

/// Read access to the code forge. Implementations are stateless request
/// functions; no caching or retrying happens at this layer.
#[async_trait]
pub trait Forge: Send + Sync {
    async fn get_repo(&self, owner: &str, repo: &str) -> Result<Repo>;

    async fn get_issue(&self, owner: &str, repo: &str, number: u64) -> Result<Issue>;

    /// List all repositories of an organization.
    async fn get_repos_of_org(&self, org: &str) -> Result<Vec<Repo>>;

    /// Fetch a file from the default branch. Returns the base64 payload.
    async fn get_blob(&self, owner: &str, repo: &str, path: &str) -> Result<String>;

    /// List all open issues and pull requests of a repository.
    async fn get_issues_for_repo(&self, owner: &str, repo: &str) -> Result<Vec<Issue>>;

    async fn get_events_for_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<TimelineEvent>>;

    async fn get_comments_for_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<Comment>>;

    async fn get_pull_request(&self, owner: &str, repo: &str, number: u64) -> Result<PullRequest>;

    async fn get_commits_for_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<Commit>>;

    async fn get_reviews_for_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<Review>>;

    /// List commit statuses for a ref, in the order the forge returns them.
    async fn get_statuses(&self, owner: &str, repo: &str, sha: &str) -> Result<Vec<Status>>;
}
