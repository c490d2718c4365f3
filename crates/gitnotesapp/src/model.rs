//! # Domain Model: Notes, Slots and Repositories
//!
//! A [`Note`] is a titled piece of text. Notes live in an ordered arena of
//! [`NoteSlot`]s owned by the note store, and a note's [`NoteId`] is its
//! 1-based position in that arena.
//!
//! ## Stable Positions
//!
//! Deleting a note never shifts the arena. The slot is flipped to
//! [`NoteSlot::Deleted`] and keeps its position, so every other note keeps
//! its id for the lifetime of the store. The durable backend persists the
//! tombstone too, which keeps ids stable across restarts.
//!
//! ```text
//! position: 0        1          2
//! slot:     Live(#1) Deleted#2  Live(#3)
//! ```
//!
//! ## Content Equality
//!
//! Two notes are content-equal iff title and body match. Ids and timestamps
//! are bookkeeping and never take part in the comparison.
//!
//! ## Repositories
//!
//! A [`Repository`] is a git working tree found under the repositories root,
//! paired with the remote link read from its `.metadata` sidecar. When the
//! sidecar is missing the link holds the configured "missing" sentinel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Stable 1-based identifier of a note slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(u64);

impl NoteId {
    /// Builds an id from a 1-based position. Zero is not a valid id.
    pub fn new(raw: u64) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    pub(crate) fn from_position(position: usize) -> Self {
        Self(position as u64 + 1)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Index of this note's slot in the ordered arena.
    pub fn position(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn new(id: NoteId, title: impl Into<String>, body: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            body: body.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn content_eq(&self, title: &str, body: &str) -> bool {
        self.title == title && self.body == body
    }
}

/// One position in the ordered note arena.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum NoteSlot {
    Live(Note),
    Deleted {
        id: NoteId,
        deleted_at: DateTime<Utc>,
    },
}

impl NoteSlot {
    pub fn id(&self) -> NoteId {
        match self {
            NoteSlot::Live(note) => note.id,
            NoteSlot::Deleted { id, .. } => *id,
        }
    }

    pub fn note(&self) -> Option<&Note> {
        match self {
            NoteSlot::Live(note) => Some(note),
            NoteSlot::Deleted { .. } => None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, NoteSlot::Deleted { .. })
    }
}

/// A git working tree known to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Repository {
    pub path: PathBuf,
    pub remote_link: String,
}

impl Repository {
    /// Short display name: the working tree's directory name.
    pub fn name(&self) -> String {
        repo_dir_name(&self.path)
    }
}

pub(crate) fn repo_dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Working tree path to remote link, as produced by a registry scan.
pub type RepoMap = BTreeMap<PathBuf, String>;
