use crate::git::GitError;
use crate::model::NoteId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitNotesError {
    #[error("Note not found: {0}")]
    NoteNotFound(NoteId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The durable store refused a write the in-memory view already assumed.
    /// The two views have diverged, so callers must not retry blindly.
    #[error("Store error: {0}")]
    Store(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("Repository {} already has an operation in flight", .0.display())]
    RepoBusy(PathBuf),

    #[error("Unknown repository: {0}")]
    UnknownRepository(String),

    #[error("Api Error: {0}")]
    Api(String),
}

impl GitNotesError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, GitNotesError>;
