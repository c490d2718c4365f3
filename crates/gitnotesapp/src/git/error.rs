//! Git operation error types.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised by a single git operation, one variant per phase.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("failed to open repository at {0}: {1}")]
    OpenRepo(PathBuf, #[source] git2::Error),

    #[error("failed to initialize repository at {0}: {1}")]
    Init(PathBuf, #[source] git2::Error),

    #[error("failed to stage files: {0}")]
    Stage(#[source] git2::Error),

    #[error("failed to create commit: {0}")]
    Commit(#[source] git2::Error),

    #[error("failed to fetch from remote: {0}")]
    Fetch(#[source] git2::Error),

    #[error("failed to push: {0}")]
    Push(#[source] git2::Error),

    #[error("push rejected: {message}")]
    PushRejected { message: String, needs_force: bool },

    #[error("branch {0} has diverged from the remote and cannot be fast-forwarded")]
    NotFastForward(String),

    #[error("failed to clone {url}: {source}")]
    Clone {
        url: String,
        #[source]
        source: git2::Error,
    },

    #[error("failed to check out {0}: {1}")]
    Checkout(String, #[source] git2::Error),

    #[error("network transfer timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("git operation panicked: {0}")]
    Panicked(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("git operation failed: {0}")]
    Git(#[from] git2::Error),
}

impl GitError {
    /// Whether running the same flow again may succeed without other changes.
    /// A rejected or diverged push becomes retryable after a pull.
    pub fn is_retryable(&self) -> bool {
        match self {
            GitError::Fetch(_)
            | GitError::Push(_)
            | GitError::PushRejected { .. }
            | GitError::NotFastForward(_)
            | GitError::Clone { .. }
            | GitError::TimedOut(_) => true,

            GitError::OpenRepo(_, _)
            | GitError::Init(_, _)
            | GitError::Stage(_)
            | GitError::Commit(_)
            | GitError::Checkout(_, _)
            | GitError::Panicked(_)
            | GitError::Io(_)
            | GitError::Git(_) => false,
        }
    }

    /// True for a push the remote refused because it would lose history.
    pub fn needs_force(&self) -> bool {
        matches!(self, GitError::PushRejected { needs_force: true, .. })
    }
}

/// Status messages git servers use for a rejected non-fast-forward update.
pub(crate) fn is_non_fast_forward(message: &str) -> bool {
    message.contains("non-fast-forward")
        || message.contains("non-fastforward")
        || message.contains("fetch first")
}
