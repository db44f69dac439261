use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use crate::bot::report::TracingReporter;
use crate::server::AppState;
use crate::webhook::events::{IssueRef, WebhookEvent};
use crate::webhook::signature::verify_signature;

pub async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(secret) = state.config.webhook_secret() {
        let signature = match headers
            .get("x-hub-signature-256")
            .and_then(|v| v.to_str().ok())
        {
            Some(sig) => sig,
            None => {
                tracing::warn!("Missing X-Hub-Signature-256 header");
                return StatusCode::UNAUTHORIZED;
            }
        };

        if let Err(e) = verify_signature(secret, &body, signature) {
            tracing::warn!(error = %e, "Webhook signature verification failed");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let event_type = match headers.get("x-github-event").and_then(|v| v.to_str().ok()) {
        Some(et) => et.to_string(),
        None => {
            tracing::warn!("Missing X-GitHub-Event header");
            return StatusCode::BAD_REQUEST;
        }
    };

    let event = match WebhookEvent::parse(&event_type, &body) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(error = %e, event_type = %event_type, "Failed to parse webhook event");
            return StatusCode::BAD_REQUEST;
        }
    };

    if let WebhookEvent::Ping = event {
        tracing::info!("Received ping event");
        return StatusCode::OK;
    }

    let Some(issue) = event.issue_ref() else {
        tracing::debug!(event_type = %event_type, "Ignoring unsupported event");
        return StatusCode::OK;
    };

    if !should_process(&issue, state.bot.bot_username()) {
        tracing::debug!(
            repo = %format!("{}/{}", issue.owner, issue.repo),
            issue = issue.number,
            "Ignoring event triggered by the bot itself"
        );
        return StatusCode::OK;
    }

    tracing::info!(
        event_type = %event_type,
        action = %issue.action,
        repo = %format!("{}/{}", issue.owner, issue.repo),
        issue = issue.number,
        "Processing issue from webhook"
    );

    let simulate = state.config.bot.simulate;
    tokio::spawn(async move {
        let result = state
            .bot
            .process_issue(
                &issue.owner,
                &issue.repo,
                issue.number,
                Arc::new(TracingReporter),
                simulate,
            )
            .await;

        if let Err(e) = result {
            tracing::error!(
                repo = %format!("{}/{}", issue.owner, issue.repo),
                issue = issue.number,
                error = %e,
                "Issue processing failed"
            );
        }
    });

    StatusCode::ACCEPTED
}

/// Events caused by the bot's own writes would otherwise trigger it again.
fn should_process(issue: &IssueRef, bot_username: &str) -> bool {
    issue.sender.as_deref() != Some(bot_username)
}
