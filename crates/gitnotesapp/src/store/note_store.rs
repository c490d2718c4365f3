use super::backend::NoteBackend;
use super::StoreEvent;
use crate::error::{GitNotesError, Result};
use crate::model::{Note, NoteId, NoteSlot};
use chrono::Utc;
use crossbeam::channel::{unbounded, Receiver, Sender};
use std::path::PathBuf;

pub struct NoteStore<B: NoteBackend> {
    /// The underlying storage backend.
    /// Exposed as pub(crate) for testing and internal access only.
    pub(crate) backend: B,
    slots: Vec<NoteSlot>,
    subscribers: Vec<Sender<StoreEvent>>,
}

impl<B: NoteBackend> NoteStore<B> {
    /// Load the arena from the backend, checking that every slot sits at the
    /// position its id names.
    pub fn open(backend: B) -> Result<Self> {
        let slots = backend.load_slots()?;
        for (position, slot) in slots.iter().enumerate() {
            if slot.id() != NoteId::from_position(position) {
                return Err(GitNotesError::Store(format!(
                    "slot at position {} carries id {}",
                    position,
                    slot.id()
                )));
            }
        }
        Ok(Self {
            backend,
            slots,
            subscribers: Vec::new(),
        })
    }

    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    fn notify(&mut self, event: StoreEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Persist `slots` and adopt them, leaving the arena untouched on failure.
    fn commit(&mut self, slots: Vec<NoteSlot>, action: &str) -> Result<()> {
        self.backend
            .save_slots(&slots)
            .map_err(|e| GitNotesError::Store(format!("{} failed: {}", action, e)))?;
        self.slots = slots;
        Ok(())
    }

    pub fn insert(&mut self, title: impl Into<String>, body: impl Into<String>) -> Result<NoteId> {
        let id = NoteId::from_position(self.slots.len());
        let mut slots = self.slots.clone();
        slots.push(NoteSlot::Live(Note::new(id, title, body)));
        self.commit(slots, "insert")?;
        tracing::debug!(%id, "note inserted");
        self.notify(StoreEvent::Inserted(id));
        Ok(id)
    }

    pub fn update(
        &mut self,
        id: NoteId,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<()> {
        let mut note = self.get(id).cloned().ok_or(GitNotesError::NoteNotFound(id))?;
        note.title = title.into();
        note.body = body.into();
        note.updated_at = Utc::now();

        let mut slots = self.slots.clone();
        slots[id.position()] = NoteSlot::Live(note);
        self.commit(slots, "update")?;
        tracing::debug!(%id, "note updated");
        self.notify(StoreEvent::Updated(id));
        Ok(())
    }

    /// Tombstone a note. Returns the number of slots affected: 1 for a live
    /// note, 0 when it was already deleted.
    pub fn delete(&mut self, id: NoteId) -> Result<usize> {
        match self.slots.get(id.position()) {
            None => Err(GitNotesError::NoteNotFound(id)),
            Some(NoteSlot::Deleted { .. }) => Ok(0),
            Some(NoteSlot::Live(_)) => {
                let mut slots = self.slots.clone();
                slots[id.position()] = NoteSlot::Deleted {
                    id,
                    deleted_at: Utc::now(),
                };
                self.commit(slots, "delete")?;
                tracing::debug!(%id, "note deleted");
                self.notify(StoreEvent::Deleted(id));
                Ok(1)
            }
        }
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.slots.get(id.position()).and_then(NoteSlot::note)
    }

    /// Ordered view of the arena; deleted slots appear as `None`.
    pub fn list(&self) -> Vec<Option<Note>> {
        self.slots.iter().map(|slot| slot.note().cloned()).collect()
    }

    /// Live notes in id order.
    pub fn notes(&self) -> impl Iterator<Item = &Note> + Clone {
        self.slots.iter().filter_map(NoteSlot::note)
    }

    pub fn slots(&self) -> &[NoteSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn location(&self) -> PathBuf {
        self.backend.location()
    }
}
