//! In-memory forge and reporter used by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::bot::report::{ReportEvent, Reporter};
use crate::error::{AppError, Result};
use crate::forge::types::*;
use crate::forge::Forge;

pub mod fixtures {
    use base64::Engine;
    use chrono::Utc;

    use crate::forge::types::*;

    pub fn repo(owner: &str, name: &str) -> Repo {
        Repo {
            name: name.to_string(),
            full_name: format!("{owner}/{name}"),
            owner: Account {
                login: owner.to_string(),
            },
            default_branch: Some("main".to_string()),
            archived: false,
            private: false,
        }
    }

    pub fn issue(number: u64) -> Issue {
        Issue {
            number,
            title: format!("Issue {number}"),
            body: None,
            state: "open".to_string(),
            labels: Vec::new(),
            user: Account {
                login: "octocat".to_string(),
            },
            locked: false,
            pull_request: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn pull_request(number: u64) -> Issue {
        Issue {
            pull_request: Some(PullRequestRef { url: None }),
            ..issue(number)
        }
    }

    pub fn status(context: &str) -> Status {
        Status {
            state: "success".to_string(),
            context: Some(context.to_string()),
            description: None,
            target_url: None,
            created_at: Utc::now(),
        }
    }

    /// Encode a settings document the way the contents API returns it.
    pub fn blob(yaml: &str) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(yaml);
        // The contents API wraps base64 at 60 columns.
        encoded
            .as_bytes()
            .chunks(60)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Forge double that records every call and the peak number of calls in flight.
pub struct MockForge {
    calls: Mutex<HashMap<&'static str, usize>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    failing: Mutex<HashSet<String>>,
    blobs: Mutex<HashMap<String, String>>,
    issues: Mutex<HashMap<String, Vec<Issue>>>,
    org_repos: Mutex<Vec<Repo>>,
    statuses: Mutex<HashMap<String, Vec<Status>>>,
    head_sha: Mutex<Option<String>>,
    delay: Mutex<Duration>,
}

impl MockForge {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            failing: Mutex::new(HashSet::new()),
            blobs: Mutex::new(HashMap::new()),
            issues: Mutex::new(HashMap::new()),
            org_repos: Mutex::new(Vec::new()),
            statuses: Mutex::new(HashMap::new()),
            head_sha: Mutex::new(Some("abc123".to_string())),
            delay: Mutex::new(Duration::from_millis(1)),
        }
    }

    /// Make `method` fail, either everywhere or only for `method:owner/repo`.
    pub fn fail(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_string());
    }

    pub fn set_settings(&self, full_name: &str, yaml: &str) {
        self.blobs
            .lock()
            .unwrap()
            .insert(full_name.to_string(), fixtures::blob(yaml));
    }

    pub fn set_raw_blob(&self, full_name: &str, content: &str) {
        self.blobs
            .lock()
            .unwrap()
            .insert(full_name.to_string(), content.to_string());
    }

    pub fn set_issues(&self, full_name: &str, issues: Vec<Issue>) {
        self.issues
            .lock()
            .unwrap()
            .insert(full_name.to_string(), issues);
    }

    pub fn set_org_repos(&self, repos: Vec<Repo>) {
        *self.org_repos.lock().unwrap() = repos;
    }

    pub fn set_statuses(&self, sha: &str, statuses: Vec<Status>) {
        self.statuses
            .lock()
            .unwrap()
            .insert(sha.to_string(), statuses);
    }

    pub fn set_head_sha(&self, sha: Option<&str>) {
        *self.head_sha.lock().unwrap() = sha.map(str::to_string);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn track(&self, method: &'static str, full_name: &str) -> Result<()> {
        *self.calls.lock().unwrap().entry(method).or_insert(0) += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let failing = self.failing.lock().unwrap();
        if failing.contains(method) || failing.contains(&format!("{method}:{full_name}")) {
            return Err(AppError::GitHubApi(format!("{method} failed for {full_name}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Forge for MockForge {
    async fn get_repo(&self, owner: &str, repo: &str) -> Result<Repo> {
        self.track("get_repo", &format!("{owner}/{repo}")).await?;
        Ok(fixtures::repo(owner, repo))
    }

    async fn get_issue(&self, owner: &str, repo: &str, number: u64) -> Result<Issue> {
        let full_name = format!("{owner}/{repo}");
        self.track("get_issue", &full_name).await?;
        let known = self
            .issues
            .lock()
            .unwrap()
            .get(&full_name)
            .and_then(|issues| issues.iter().find(|i| i.number == number).cloned());
        Ok(known.unwrap_or_else(|| fixtures::issue(number)))
    }

    async fn get_repos_of_org(&self, org: &str) -> Result<Vec<Repo>> {
        self.track("get_repos_of_org", org).await?;
        Ok(self.org_repos.lock().unwrap().clone())
    }

    async fn get_blob(&self, owner: &str, repo: &str, path: &str) -> Result<String> {
        let full_name = format!("{owner}/{repo}");
        self.track("get_blob", &full_name).await?;
        self.blobs
            .lock()
            .unwrap()
            .get(&full_name)
            .cloned()
            .ok_or_else(|| AppError::GitHubApi(format!("Not Found: {path}")))
    }

    async fn get_issues_for_repo(&self, owner: &str, repo: &str) -> Result<Vec<Issue>> {
        let full_name = format!("{owner}/{repo}");
        self.track("get_issues_for_repo", &full_name).await?;
        Ok(self
            .issues
            .lock()
            .unwrap()
            .get(&full_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_events_for_issue(
        &self,
        owner: &str,
        repo: &str,
        _number: u64,
    ) -> Result<Vec<TimelineEvent>> {
        self.track("get_events_for_issue", &format!("{owner}/{repo}"))
            .await?;
        Ok(Vec::new())
    }

    async fn get_comments_for_issue(
        &self,
        owner: &str,
        repo: &str,
        _number: u64,
    ) -> Result<Vec<Comment>> {
        self.track("get_comments_for_issue", &format!("{owner}/{repo}"))
            .await?;
        Ok(Vec::new())
    }

    async fn get_pull_request(&self, owner: &str, repo: &str, number: u64) -> Result<PullRequest> {
        self.track("get_pull_request", &format!("{owner}/{repo}"))
            .await?;
        let sha = self.head_sha.lock().unwrap().clone();
        Ok(PullRequest {
            number,
            state: "open".to_string(),
            title: None,
            head: GitRef {
                ref_name: "feature".to_string(),
                sha,
                label: None,
            },
            base: GitRef {
                ref_name: "main".to_string(),
                sha: None,
                label: None,
            },
            merged: Some(false),
            mergeable: None,
            mergeable_state: None,
        })
    }

    async fn get_commits_for_pull_request(
        &self,
        owner: &str,
        repo: &str,
        _number: u64,
    ) -> Result<Vec<Commit>> {
        self.track("get_commits_for_pull_request", &format!("{owner}/{repo}"))
            .await?;
        Ok(Vec::new())
    }

    async fn get_reviews_for_pull_request(
        &self,
        owner: &str,
        repo: &str,
        _number: u64,
    ) -> Result<Vec<Review>> {
        self.track("get_reviews_for_pull_request", &format!("{owner}/{repo}"))
            .await?;
        Ok(Vec::new())
    }

    async fn get_statuses(&self, owner: &str, repo: &str, sha: &str) -> Result<Vec<Status>> {
        self.track("get_statuses", &format!("{owner}/{repo}")).await?;
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(sha)
            .cloned()
            .unwrap_or_default())
    }
}

/// Reporter that keeps every event for later assertions.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn events_for(&self, item: &str) -> Vec<ReportEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.item() == item)
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: ReportEvent) {
        self.events.lock().unwrap().push(event);
    }
}
