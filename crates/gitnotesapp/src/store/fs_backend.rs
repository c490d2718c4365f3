use super::backend::NoteBackend;
use crate::error::{GitNotesError, Result};
use crate::model::NoteSlot;
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

pub const NOTES_FILE: &str = "notes.json";

/// Stores the note arena as `notes.json` inside the data directory.
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn data_file(&self) -> PathBuf {
        self.root.join(NOTES_FILE)
    }
}

impl NoteBackend for FsBackend {
    fn load_slots(&self) -> Result<Vec<NoteSlot>> {
        let data_file = self.data_file();
        if !data_file.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(data_file).map_err(GitNotesError::Io)?;
        let slots: Vec<NoteSlot> =
            serde_json::from_str(&content).map_err(GitNotesError::Serialization)?;
        Ok(slots)
    }

    fn save_slots(&self, slots: &[NoteSlot]) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(GitNotesError::Io)?;

        let content = serde_json::to_string_pretty(slots).map_err(GitNotesError::Serialization)?;

        // Atomic write
        let tmp_file = self.root.join(format!(".notes-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp_file, content).map_err(GitNotesError::Io)?;
        fs::rename(&tmp_file, self.data_file()).map_err(GitNotesError::Io)?;

        Ok(())
    }

    fn location(&self) -> PathBuf {
        self.data_file()
    }
}
