use async_trait::async_trait;
use octocrab::Octocrab;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::GitHubConfig;
use crate::error::{AppError, Result};
use crate::forge::types::*;
use crate::forge::Forge;

const PER_PAGE: usize = 100;

#[derive(Debug, Serialize)]
struct PageQuery<'a> {
    per_page: usize,
    page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a str>,
}

/// `Forge` backed by the GitHub REST API.
pub struct GitHubForge {
    client: Octocrab,
}

impl GitHubForge {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let mut builder = Octocrab::builder();

        if let Some(token) = &config.token {
            builder = builder.personal_token(token.clone());
        }

        if let Some(base) = &config.api_base {
            builder = builder
                .base_uri(base.as_str())
                .map_err(|e| AppError::Config(format!("Invalid GitHub API base {base}: {e}")))?;
        }

        let client = builder
            .build()
            .map_err(|e| AppError::GitHubApi(format!("Failed to build octocrab client: {e}")))?;

        Ok(Self { client })
    }

    fn repo_route(owner: &str, repo: &str) -> String {
        format!(
            "/repos/{}/{}",
            urlencoding::encode(owner),
            urlencoding::encode(repo)
        )
    }

    async fn get_one<T: DeserializeOwned + Send>(&self, route: &str) -> Result<T> {
        tracing::debug!(route = %route, "GitHub request");
        self.client
            .get(route, None::<&()>)
            .await
            .map_err(|e| AppError::GitHubApi(format!("GET {route} failed: {e}")))
    }

    /// Follow page numbers until a short page comes back.
    async fn get_all<T: DeserializeOwned + Send>(
        &self,
        route: &str,
        state: Option<&str>,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let query = PageQuery {
                per_page: PER_PAGE,
                page,
                state,
            };
            tracing::debug!(route = %route, page = page, "GitHub paginated request");

            let batch: Vec<T> = self
                .client
                .get(route, Some(&query))
                .await
                .map_err(|e| AppError::GitHubApi(format!("GET {route} failed: {e}")))?;

            let len = batch.len();
            items.extend(batch);
            if len < PER_PAGE {
                return Ok(items);
            }
            page += 1;
        }
    }
}

#[async_trait]
impl Forge for GitHubForge {
    async fn get_repo(&self, owner: &str, repo: &str) -> Result<Repo> {
        self.get_one(&Self::repo_route(owner, repo)).await
    }

    async fn get_issue(&self, owner: &str, repo: &str, number: u64) -> Result<Issue> {
        let route = format!("{}/issues/{number}", Self::repo_route(owner, repo));
        self.get_one(&route).await
    }

    async fn get_repos_of_org(&self, org: &str) -> Result<Vec<Repo>> {
        let route = format!("/orgs/{}/repos", urlencoding::encode(org));
        self.get_all(&route, None).await
    }

    async fn get_blob(&self, owner: &str, repo: &str, path: &str) -> Result<String> {
        let encoded_path = path
            .trim_start_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let route = format!("{}/contents/{encoded_path}", Self::repo_route(owner, repo));

        let blob: Blob = self.get_one(&route).await?;
        match blob.encoding.as_deref() {
            None | Some("base64") => Ok(blob.content),
            Some(other) => Err(AppError::GitHubApi(format!(
                "Unsupported content encoding '{other}' for {path}"
            ))),
        }
    }

    async fn get_issues_for_repo(&self, owner: &str, repo: &str) -> Result<Vec<Issue>> {
        let route = format!("{}/issues", Self::repo_route(owner, repo));
        self.get_all(&route, Some("open")).await
    }

    async fn get_events_for_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<TimelineEvent>> {
        let route = format!("{}/issues/{number}/timeline", Self::repo_route(owner, repo));
        self.get_all(&route, None).await
    }

    async fn get_comments_for_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<Comment>> {
        let route = format!("{}/issues/{number}/comments", Self::repo_route(owner, repo));
        self.get_all(&route, None).await
    }

    async fn get_pull_request(&self, owner: &str, repo: &str, number: u64) -> Result<PullRequest> {
        let route = format!("{}/pulls/{number}", Self::repo_route(owner, repo));
        self.get_one(&route).await
    }

    async fn get_commits_for_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<Commit>> {
        let route = format!("{}/pulls/{number}/commits", Self::repo_route(owner, repo));
        self.get_all(&route, None).await
    }

    async fn get_reviews_for_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<Review>> {
        let route = format!("{}/pulls/{number}/reviews", Self::repo_route(owner, repo));
        self.get_all(&route, None).await
    }

    async fn get_statuses(&self, owner: &str, repo: &str, sha: &str) -> Result<Vec<Status>> {
        let route = format!(
            "{}/commits/{}/statuses",
            Self::repo_route(owner, repo),
            urlencoding::encode(sha)
        );
        self.get_all(&route, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_route_encodes_segments() {
        assert_eq!(GitHubForge::repo_route("acme", "widgets"), "/repos/acme/widgets");
        assert_eq!(
            GitHubForge::repo_route("acme", "we ird"),
            "/repos/acme/we%20ird"
        );
    }

    #[test]
    fn test_page_query_omits_missing_state() {
        let query = PageQuery {
            per_page: PER_PAGE,
            page: 2,
            state: None,
        };
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value, serde_json::json!({ "per_page": 100, "page": 2 }));
    }
}
