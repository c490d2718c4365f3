//! # Storage Layer
//!
//! This module defines the durable note collection. [`NoteStore`] owns an
//! ordered arena of [`NoteSlot`](crate::model::NoteSlot)s and delegates raw
//! persistence to a [`backend::NoteBackend`].
//!
//! ## Id Assignment
//!
//! Ids are 1-based arena positions. `insert` appends and the new note's id is
//! the new arena length. Nothing ever removes a slot, so an id is never
//! reused and never moves.
//!
//! ## Deletion Lifecycle
//!
//! - **Delete**: The slot becomes `Deleted { id, deleted_at }`. Its position stays.
//! - Deleting an already deleted slot affects zero rows.
//!
//! ## Failure Semantics
//!
//! The in-memory arena is updated only after the backend accepted the write.
//! A refused write is reported as [`GitNotesError::Store`](crate::error::GitNotesError::Store):
//! the caller asserted the note existed, so the durable and in-memory views
//! have already diverged and retrying is not safe.
//!
//! ## Observation
//!
//! [`NoteStore::subscribe`] hands out a channel receiving a [`StoreEvent`] for
//! every successful mutation. Disconnected subscribers are dropped lazily.
//!
//! ## Implementations
//!
//! - [`fs_backend::FsBackend`]: `notes.json` in the data directory, atomic writes.
//! - [`mem_backend::MemBackend`]: For testing logic without filesystem I/O.
//!
//! ## Storage Layout
//!
//! ```text
//! <data dir>/
//! ├── notes.json          # Note arena (live and deleted slots)
//! ├── credentials.json    # Username and token
//! ├── gitnotes.toml       # Configuration
//! └── repos/              # Git working trees
//! ```

use crate::model::NoteId;

pub mod backend;
pub mod fs_backend;
pub mod mem_backend;
pub mod note_store;

pub use note_store::NoteStore;

/// Notification emitted after a successful store mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Inserted(NoteId),
    Updated(NoteId),
    Deleted(NoteId),
}
