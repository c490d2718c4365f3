//! # Command Layer
//!
//! The business logic behind every gitnotes operation. Each command lives in its
//! own submodule as a plain function over the note store or the sync
//! orchestrator.
//!
//! ## What Commands Do NOT Do
//!
//! - **Any terminal I/O**: no stdout, stderr or formatting
//! - **Argument parsing**: that is the CLI layer's job
//! - **Exit codes**: they return `Result` and let the caller decide
//!
//! ## Structured Returns
//!
//! Commands return [`CmdResult`], not strings:
//! - `affected_notes`: notes that were created or modified
//! - `listed_notes`: notes to display
//! - `repositories`: working trees to display
//! - `reconciled`: what a pull or clone changed in the store
//! - `messages`: leveled messages (info, success, warning, error)
//!
//! ## Command Modules
//!
//! - [`notes`]: add, list, view, edit and delete notes
//! - [`repos`]: create, list and remove working trees
//! - [`sync`]: push, pull and clone
//! - [`login`]: store credentials

use crate::model::{Note, Repository};
use crate::reconcile::ReconcileReport;
use serde::Serialize;

pub mod login;
pub mod notes;
pub mod repos;
pub mod sync;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct CmdResult {
    pub affected_notes: Vec<Note>,
    pub listed_notes: Vec<Note>,
    pub repositories: Vec<Repository>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconciled: Option<ReconcileReport>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_listed_notes(mut self, notes: Vec<Note>) -> Self {
        self.listed_notes = notes;
        self
    }

    pub fn with_repositories(mut self, repositories: Vec<Repository>) -> Self {
        self.repositories = repositories;
        self
    }
}
