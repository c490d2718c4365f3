use super::backend::NoteBackend;
use crate::error::{GitNotesError, Result};
use crate::model::NoteSlot;
use std::cell::RefCell;
use std::path::PathBuf;

/// In-memory storage backend for testing.
///
/// Uses `RefCell` for interior mutability since the store is only touched
/// from the orchestrator's thread. The `NoteBackend` trait can then use
/// `&self` for all methods.
#[derive(Default)]
pub struct MemBackend {
    slots: RefCell<Vec<NoteSlot>>,
    simulate_write_error: RefCell<bool>,
    saves: RefCell<usize>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the backend as if a previous process had saved these slots.
    pub fn with_slots(slots: Vec<NoteSlot>) -> Self {
        Self {
            slots: RefCell::new(slots),
            ..Default::default()
        }
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        *self.simulate_write_error.borrow_mut() = simulate;
    }

    /// Number of successful saves, for asserting that no-op passes stay quiet.
    pub fn save_count(&self) -> usize {
        *self.saves.borrow()
    }
}

impl NoteBackend for MemBackend {
    fn load_slots(&self) -> Result<Vec<NoteSlot>> {
        Ok(self.slots.borrow().clone())
    }

    fn save_slots(&self, slots: &[NoteSlot]) -> Result<()> {
        if *self.simulate_write_error.borrow() {
            return Err(GitNotesError::Store("Simulated write error".to_string()));
        }
        *self.slots.borrow_mut() = slots.to_vec();
        *self.saves.borrow_mut() += 1;
        Ok(())
    }

    fn location(&self) -> PathBuf {
        PathBuf::from("memory://notes")
    }
}
