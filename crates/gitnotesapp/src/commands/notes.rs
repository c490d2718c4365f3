use crate::commands::{CmdMessage, CmdResult};
use crate::error::{GitNotesError, Result};
use crate::model::NoteId;
use crate::store::backend::NoteBackend;
use crate::store::NoteStore;

pub fn add<B: NoteBackend>(store: &mut NoteStore<B>, title: &str, body: &str) -> Result<CmdResult> {
    let id = store.insert(title, body)?;
    let mut result = CmdResult::default();
    if let Some(note) = store.get(id) {
        result.affected_notes.push(note.clone());
    }
    result.add_message(CmdMessage::success(format!("Note created ({}): {}", id, title)));
    Ok(result)
}

pub fn list<B: NoteBackend>(store: &NoteStore<B>) -> Result<CmdResult> {
    let notes = store.notes().cloned().collect();
    Ok(CmdResult::default().with_listed_notes(notes))
}

pub fn view<B: NoteBackend>(store: &NoteStore<B>, ids: &[NoteId]) -> Result<CmdResult> {
    let notes = ids
        .iter()
        .map(|&id| store.get(id).cloned().ok_or(GitNotesError::NoteNotFound(id)))
        .collect::<Result<Vec<_>>>()?;
    Ok(CmdResult::default().with_listed_notes(notes))
}

/// Replace a note's title and/or body. Missing parts keep their value.
pub fn edit<B: NoteBackend>(
    store: &mut NoteStore<B>,
    id: NoteId,
    title: Option<&str>,
    body: Option<&str>,
) -> Result<CmdResult> {
    let current = store.get(id).cloned().ok_or(GitNotesError::NoteNotFound(id))?;
    let title = title.unwrap_or(&current.title).to_string();
    let body = body.unwrap_or(&current.body).to_string();

    let mut result = CmdResult::default();
    if current.content_eq(&title, &body) {
        result.add_message(CmdMessage::info(format!("Note {} unchanged", id)));
        return Ok(result);
    }

    store.update(id, title, body)?;
    if let Some(note) = store.get(id) {
        result.add_message(CmdMessage::success(format!(
            "Note updated ({}): {}",
            id, note.title
        )));
        result.affected_notes.push(note.clone());
    }
    Ok(result)
}

pub fn delete<B: NoteBackend>(store: &mut NoteStore<B>, ids: &[NoteId]) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    for &id in ids {
        let title = store.get(id).map(|note| note.title.clone());
        match store.delete(id)? {
            0 => result.add_message(CmdMessage::warning(format!("Note {} was already deleted", id))),
            _ => result.add_message(CmdMessage::success(format!(
                "Note deleted ({}): {}",
                id,
                title.unwrap_or_default()
            ))),
        }
    }
    Ok(result)
}
