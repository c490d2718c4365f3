//! # API Facade
//!
//! A thin facade over the command layer and the single entry point for every
//! gitnotes operation, whatever the UI.
//!
//! The facade:
//! - **Dispatches** to the matching command function
//! - **Normalizes inputs** (note id strings become [`NoteId`]s)
//! - **Returns structured types** (`Result<CmdResult>`)
//!
//! It holds no business logic and does no terminal I/O.
//!
//! ## Note Ids
//!
//! Notes are addressed by their 1-based id as shown by `list`. Ranges such as
//! `2-4` expand in order. Duplicates are dropped while keeping first-seen
//! order.
//!
//! ## Generic Over Storage
//!
//! `GitNotesApi<B, C>` is generic over the note backend and the credential
//! store: production uses `FsBackend` and `FsCredentialStore`, tests use the
//! in-memory ones.

use crate::commands::{self, CmdResult};
use crate::credentials::CredentialStore;
use crate::error::{GitNotesError, Result};
use crate::model::NoteId;
use crate::store::backend::NoteBackend;
use crate::sync::SyncOrchestrator;
use std::collections::HashSet;

pub struct GitNotesApi<B: NoteBackend, C: CredentialStore> {
    sync: SyncOrchestrator<B, C>,
}

impl<B: NoteBackend, C: CredentialStore> GitNotesApi<B, C> {
    pub fn new(sync: SyncOrchestrator<B, C>) -> Self {
        Self { sync }
    }

    pub fn sync(&self) -> &SyncOrchestrator<B, C> {
        &self.sync
    }

    pub fn sync_mut(&mut self) -> &mut SyncOrchestrator<B, C> {
        &mut self.sync
    }

    // --- Notes ---

    pub fn add_note(&mut self, title: &str, body: &str) -> Result<CmdResult> {
        commands::notes::add(self.sync.store_mut(), title, body)
    }

    pub fn list_notes(&self) -> Result<CmdResult> {
        commands::notes::list(self.sync.store())
    }

    pub fn view_notes<I: AsRef<str>>(&self, ids: &[I]) -> Result<CmdResult> {
        let ids = parse_note_ids(ids)?;
        commands::notes::view(self.sync.store(), &ids)
    }

    pub fn edit_note(&mut self, id: &str, title: Option<&str>, body: Option<&str>) -> Result<CmdResult> {
        let id = parse_note_id(id)?;
        commands::notes::edit(self.sync.store_mut(), id, title, body)
    }

    pub fn delete_notes<I: AsRef<str>>(&mut self, ids: &[I]) -> Result<CmdResult> {
        let ids = parse_note_ids(ids)?;
        commands::notes::delete(self.sync.store_mut(), &ids)
    }

    // --- Repositories ---

    pub fn create_repository(&mut self, name: &str, remote: Option<&str>) -> Result<CmdResult> {
        commands::repos::create(&mut self.sync, name, remote)
    }

    pub fn list_repositories(&mut self) -> Result<CmdResult> {
        commands::repos::list(&mut self.sync)
    }

    pub fn remove_repository(&mut self, name: &str) -> Result<CmdResult> {
        commands::repos::remove(&mut self.sync, name)
    }

    // --- Sync ---

    pub fn push(&mut self, repository: &str, force: bool) -> Result<CmdResult> {
        commands::sync::push(&mut self.sync, repository, force)
    }

    pub fn pull(&mut self, repository: &str, remote: Option<&str>) -> Result<CmdResult> {
        commands::sync::pull(&mut self.sync, repository, remote)
    }

    pub fn clone_repository(&mut self, url: &str) -> Result<CmdResult> {
        commands::sync::clone(&mut self.sync, url)
    }

    pub fn login(&self, username: Option<&str>, token: &str) -> Result<CmdResult> {
        commands::login::run(&self.sync, username, token)
    }
}

fn parse_note_id(input: &str) -> Result<NoteId> {
    input
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(NoteId::new)
        .ok_or_else(|| GitNotesError::Api(format!("Invalid note id: {}", input)))
}

/// Parse ids and `start-end` ranges, deduplicating in first-seen order.
fn parse_note_ids<I: AsRef<str>>(inputs: &[I]) -> Result<Vec<NoteId>> {
    let mut ids = Vec::new();
    for input in inputs {
        let input = input.as_ref().trim();
        match input.split_once('-') {
            Some((start, end)) => {
                let start = parse_note_id(start)?;
                let end = parse_note_id(end)?;
                if start > end {
                    return Err(GitNotesError::Api(format!(
                        "Invalid range {}: start is after end",
                        input
                    )));
                }
                ids.extend((start.get()..=end.get()).filter_map(NoteId::new));
            }
            None => ids.push(parse_note_id(input)?),
        }
    }

    let mut seen = HashSet::new();
    ids.retain(|id| seen.insert(*id));
    if ids.is_empty() {
        return Err(GitNotesError::Api("No note ids given".to_string()));
    }
    Ok(ids)
}
