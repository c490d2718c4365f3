use crate::error::Result;
use crate::model::NoteSlot;
use std::path::PathBuf;

/// Abstract interface for raw note storage I/O.
/// This trait handles the "how" of storage (filesystem vs memory),
/// while NoteStore handles the "what" (id assignment, tombstones, events).
pub trait NoteBackend {
    /// Load every slot in arena order. A missing store is an empty arena.
    fn load_slots(&self) -> Result<Vec<NoteSlot>>;

    /// Persist the whole arena.
    /// MUST be atomic (e.g. write to tmp then rename) to avoid partial writes.
    fn save_slots(&self, slots: &[NoteSlot]) -> Result<()>;

    /// Where the arena lives. For MemBackend, a virtual path.
    fn location(&self) -> PathBuf;
}
