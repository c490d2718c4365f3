//! # Reconciliation
//!
//! After a pull or clone fills a working tree with note files, each file is
//! joined against the note store so that notes edited elsewhere update in
//! place instead of piling up as duplicates.
//!
//! ## Matching
//!
//! Files are processed in directory enumeration order, which is treated as
//! unordered. For each file:
//!
//! 1. **Already present**: a live note content-equal to the file (bodies
//!    compared after line-ending normalization) resolves it with no write.
//! 2. Otherwise live notes are scanned in id order, first hit wins:
//!    - same non-blank title, differing non-blank body → **update body**
//!    - same non-blank body, differing non-blank title → **update title**
//! 3. No hit → **insert** a new note.
//!
//! A blank title or blank body is never a basis for a match, so blank notes
//! do not all collapse onto one blank file.
//!
//! ## Known Duplicate
//!
//! When title *and* body both differ from every note the file is inserted as
//! a new note, even if it is an edited version of an existing one. This is
//! a best-effort heuristic join, not a three-way merge.

use crate::codec::{self, NoteFile, NoteFiles};
use crate::error::Result;
use crate::model::{Note, NoteId};
use crate::store::backend::NoteBackend;
use crate::store::NoteStore;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Unchanged(NoteId),
    UpdateBody(NoteId),
    UpdateTitle(NoteId),
    Insert,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub inserted: Vec<NoteId>,
    pub updated_bodies: Vec<NoteId>,
    pub updated_titles: Vec<NoteId>,
    pub unchanged: usize,
}

impl ReconcileReport {
    pub fn changed(&self) -> usize {
        self.inserted.len() + self.updated_bodies.len() + self.updated_titles.len()
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Decide what a single `(title, body)` pair means for the existing notes.
/// `body` is expected in normalized form, as produced by the codec.
pub fn decide<'a, I>(notes: I, title: &str, body: &str) -> Decision
where
    I: IntoIterator<Item = &'a Note>,
    I::IntoIter: Clone,
{
    let notes = notes.into_iter();

    if let Some(existing) = notes
        .clone()
        .find(|n| n.title == title && codec::normalize_body(&n.body) == body)
    {
        return Decision::Unchanged(existing.id);
    }

    let title_usable = !is_blank(title);
    let body_usable = !is_blank(body);

    for existing in notes {
        let existing_body = codec::normalize_body(&existing.body);
        let titles_usable = title_usable && !is_blank(&existing.title);
        let bodies_usable = body_usable && !is_blank(&existing_body);

        if titles_usable && existing.title == title {
            if bodies_usable && existing_body != body {
                return Decision::UpdateBody(existing.id);
            }
        } else if bodies_usable && existing_body == body && titles_usable && existing.title != title {
            return Decision::UpdateTitle(existing.id);
        }
    }

    Decision::Insert
}

/// Join a sequence of note files into the store.
///
/// Store failures abort the pass: they mean the durable store refused a
/// write for a note the arena says exists.
pub fn reconcile_files<B, I>(store: &mut NoteStore<B>, files: I) -> Result<ReconcileReport>
where
    B: NoteBackend,
    I: IntoIterator<Item = NoteFile>,
{
    let mut report = ReconcileReport::default();

    for file in files {
        let decision = decide(store.notes(), &file.title, &file.body);
        match decision {
            Decision::Unchanged(_) => report.unchanged += 1,
            Decision::UpdateBody(id) => {
                let title = store.get(id).map(|n| n.title.clone()).unwrap_or_default();
                store.update(id, title, file.body)?;
                report.updated_bodies.push(id);
            }
            Decision::UpdateTitle(id) => {
                let body = store.get(id).map(|n| n.body.clone()).unwrap_or_default();
                store.update(id, file.title, body)?;
                report.updated_titles.push(id);
            }
            Decision::Insert => {
                let id = store.insert(file.title, file.body)?;
                report.inserted.push(id);
            }
        }
    }

    tracing::info!(
        inserted = report.inserted.len(),
        updated_bodies = report.updated_bodies.len(),
        updated_titles = report.updated_titles.len(),
        unchanged = report.unchanged,
        "reconciliation finished"
    );
    Ok(report)
}

pub fn reconcile_directory<B: NoteBackend>(
    store: &mut NoteStore<B>,
    files: &NoteFiles,
) -> Result<ReconcileReport> {
    tracing::debug!(directory = %files.directory().display(), "reconciling note files");
    reconcile_files(store, files.iter())
}
