use serde::Deserialize;

/// Webhook event parsed from the payload based on the X-GitHub-Event header.
/// Only the parts needed to locate the affected issue are kept.
#[derive(Debug)]
pub enum WebhookEvent {
    Issues(IssueEvent),
    IssueComment(IssueEvent),
    PullRequest(PullRequestEvent),
    PullRequestReview(PullRequestEvent),
    PullRequestReviewComment(PullRequestEvent),
    Ping,
    Unsupported(String),
}

#[derive(Debug, Deserialize)]
pub struct IssueEvent {
    pub action: String,
    pub issue: NumberPayload,
    pub repository: RepositoryPayload,
    pub sender: Option<UserPayload>,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub pull_request: NumberPayload,
    pub repository: RepositoryPayload,
    pub sender: Option<UserPayload>,
}

#[derive(Debug, Deserialize)]
pub struct NumberPayload {
    pub number: u64,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryPayload {
    pub name: String,
    pub full_name: String,
    pub owner: UserPayload,
}

#[derive(Debug, Deserialize)]
pub struct UserPayload {
    pub login: String,
}

/// The issue an event is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub action: String,
    pub sender: Option<String>,
}

impl WebhookEvent {
    pub fn parse(event_type: &str, body: &[u8]) -> Result<Self, serde_json::Error> {
        match event_type {
            "issues" => Ok(WebhookEvent::Issues(serde_json::from_slice(body)?)),
            "issue_comment" => Ok(WebhookEvent::IssueComment(serde_json::from_slice(body)?)),
            "pull_request" => Ok(WebhookEvent::PullRequest(serde_json::from_slice(body)?)),
            "pull_request_review" => Ok(WebhookEvent::PullRequestReview(serde_json::from_slice(
                body,
            )?)),
            "pull_request_review_comment" => Ok(WebhookEvent::PullRequestReviewComment(
                serde_json::from_slice(body)?,
            )),
            "ping" => Ok(WebhookEvent::Ping),
            other => Ok(WebhookEvent::Unsupported(other.to_string())),
        }
    }

    pub fn issue_ref(&self) -> Option<IssueRef> {
        let (action, number, repository, sender) = match self {
            WebhookEvent::Issues(e) | WebhookEvent::IssueComment(e) => {
                (&e.action, e.issue.number, &e.repository, &e.sender)
            }
            WebhookEvent::PullRequest(e)
            | WebhookEvent::PullRequestReview(e)
            | WebhookEvent::PullRequestReviewComment(e) => {
                (&e.action, e.pull_request.number, &e.repository, &e.sender)
            }
            WebhookEvent::Ping | WebhookEvent::Unsupported(_) => return None,
        };

        Some(IssueRef {
            owner: repository.owner.login.clone(),
            repo: repository.name.clone(),
            number,
            action: action.clone(),
            sender: sender.as_ref().map(|s| s.login.clone()),
        })
    }
}
