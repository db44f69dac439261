use serde::Serialize;

use crate::error::AppError;

/// Lifecycle step of a reported item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Change {
    Queued,
    Start,
    Done,
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Change::Queued => f.write_str("queued"),
            Change::Start => f.write_str("start"),
            Change::Done => f.write_str("done"),
        }
    }
}

/// Progress notice about one work item, issue or repository.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportEvent {
    Action {
        item: String,
        action: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        change: Option<Change>,
    },
    Error {
        item: String,
        error: String,
        stack: String,
    },
}

impl ReportEvent {
    pub fn change(item: &str, action: &str, change: Change) -> Self {
        ReportEvent::Action {
            item: item.to_string(),
            action: action.to_string(),
            change: Some(change),
        }
    }

    pub fn action(item: &str, action: &str) -> Self {
        ReportEvent::Action {
            item: item.to_string(),
            action: action.to_string(),
            change: None,
        }
    }

    pub fn error(item: &str, error: &AppError) -> Self {
        ReportEvent::Error {
            item: item.to_string(),
            error: error.to_string(),
            stack: error.stack(),
        }
    }

    pub fn item(&self) -> &str {
        match self {
            ReportEvent::Action { item, .. } | ReportEvent::Error { item, .. } => item,
        }
    }
}

/// Sink for progress events. Called synchronously from the pipeline.
pub trait Reporter: Send + Sync {
    fn report(&self, event: ReportEvent);
}

impl<F> Reporter for F
where
    F: Fn(ReportEvent) + Send + Sync,
{
    fn report(&self, event: ReportEvent) {
        self(event)
    }
}

/// Discards every event.
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn report(&self, _event: ReportEvent) {}
}

/// Writes events to the tracing subscriber.
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: ReportEvent) {
        match &event {
            ReportEvent::Action {
                item,
                action,
                change: Some(change),
            } => tracing::info!(item = %item, change = %change, "{action}"),
            ReportEvent::Action {
                item,
                action,
                change: None,
            } => tracing::info!(item = %item, "{action}"),
            ReportEvent::Error { item, error, stack } => {
                tracing::error!(item = %item, stack = %stack, "{error}")
            }
        }
    }
}

/// Writes one JSON object per event to stdout.
pub struct JsonReporter;

impl Reporter for JsonReporter {
    fn report(&self, event: ReportEvent) {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize report event"),
        }
    }
}
