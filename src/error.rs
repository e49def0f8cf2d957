//! Error types shared by the API client, the fetch pipeline and the
//! report writer.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::github::Repo;

/// Failure reported by a [`PullRequestSource`](crate::github::PullRequestSource).
///
/// The client never retries; every variant reaches the caller unchanged.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("API rate limit exceeded{}", format_reset(.reset_at))]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    #[error("network request failed: {0}")]
    Transport(String),

    #[error("GitHub API returned {code}: {message}")]
    Status { code: u16, message: String },

    #[error("unexpected response payload: {0}")]
    Decode(String),
}

fn format_reset(reset_at: &Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(at) => format!(" (quota resets at {})", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => String::new(),
    }
}

impl ApiError {
    /// Short tag used in user-facing messages, e.g. `error[auth]`.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Auth(_) => "auth",
            ApiError::RateLimited { .. } => "rate-limit",
            ApiError::Transport(_) => "transport",
            ApiError::Status { .. } => "api",
            ApiError::Decode(_) => "decode",
        }
    }
}

/// A repository fetch failed; the run stops at this repository.
#[derive(Error, Debug)]
#[error("{repository}: {source}")]
pub struct RunError {
    pub repository: Repo,
    #[source]
    pub source: ApiError,
}

/// Writing a rendered report failed.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write to stdout: {0}")]
    Stdout(#[source] std::io::Error),

    #[error("failed to render report: {0}")]
    Render(String),
}
