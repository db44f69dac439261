use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Webhook verification failed: {0}")]
    WebhookVerification(String),

    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    #[error("Cannot read settings file in {owner}/{repo}: {source}")]
    Settings {
        owner: String,
        repo: String,
        #[source]
        source: SettingsError,
    },

    #[error("Reject to process repo of different bot user: {repo} is configured for {expected}, running as {actual}")]
    DifferentBot {
        repo: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid target '{0}': expected org, owner/repo or owner/repo#number")]
    InvalidTarget(String),

    #[error("Rule engine error: {0}")]
    Rules(String),

    /// A failure memoized by a lazy issue field, shared by every reader.
    #[error(transparent)]
    Shared(Arc<AppError>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a repository's settings file could not be turned into a `RepoConfig`.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{0}")]
    Fetch(Box<AppError>),

    #[error("invalid base64 content: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("content is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("{0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{0}")]
    Invalid(String),
}

impl From<octocrab::Error> for AppError {
    fn from(e: octocrab::Error) -> Self {
        AppError::GitHubApi(e.to_string())
    }
}

impl AppError {
    /// Render the error followed by its chain of causes, one per line.
    pub fn stack(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str("\n    caused by: ");
            out.push_str(&cause.to_string());
            source = cause.source();
        }
        out
    }

    /// Unwrap shared errors down to the error that was originally raised.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::Shared(inner) => inner.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
