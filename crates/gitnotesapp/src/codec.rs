//! # Note Files
//!
//! Maps notes to plain text files at the top level of a working tree and back.
//!
//! ```text
//! <working tree>/
//! ├── .git/
//! ├── .metadata
//! ├── Shopping.txt        # title "Shopping", body = file contents
//! └── Ideas.txt
//! ```
//!
//! ## Filenames
//!
//! The file stem is the note title with `\ / : * ? " < > |` replaced by `_`,
//! truncated to 250 characters, followed by `.txt`.
//!
//! Reading strips the extension at the *first* dot, so `v1.2 notes.txt` reads
//! back as title `v1`. Distinct titles may also collide on one filename. The
//! mapping is lossy on purpose and nothing here tries to hide that.
//!
//! ## Bodies
//!
//! Written verbatim. On read every line gets a trailing `\n`, which normalizes
//! `\r\n` endings and guarantees a final newline.
//!
//! ## Failure Handling
//!
//! Batch writes log and skip individual failures: one bad title must not keep
//! every other note off disk.

use crate::model::Note;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const NOTE_EXT: &str = ".txt";
pub const MAX_STEM_CHARS: usize = 250;

const ILLEGAL_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Replace filesystem-illegal characters and cap the length.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| if ILLEGAL_CHARS.contains(&c) { '_' } else { c })
        .take(MAX_STEM_CHARS)
        .collect()
}

pub fn note_file_name(title: &str) -> String {
    format!("{}{}", sanitize_title(title), NOTE_EXT)
}

/// Line-ending normalization applied to every body read from disk.
pub fn normalize_body(raw: &str) -> String {
    let mut body = String::with_capacity(raw.len() + 1);
    for line in raw.lines() {
        body.push_str(line);
        body.push('\n');
    }
    body
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

/// Write one file per note, overwriting same-named files.
pub fn write_notes<'a, I>(directory: &Path, notes: I) -> WriteReport
where
    I: IntoIterator<Item = &'a Note>,
{
    let mut report = WriteReport::default();
    for note in notes {
        let path = directory.join(note_file_name(&note.title));
        match fs::write(&path, &note.body) {
            Ok(()) => report.written.push(path),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to write note file");
                report.failed.push(path);
            }
        }
    }
    tracing::debug!(
        directory = %directory.display(),
        written = report.written.len(),
        failed = report.failed.len(),
        "note files written"
    );
    report
}

/// Remove top-level `.txt` files that no live note maps to. Returns the
/// number of files removed. Failures are logged and skipped.
pub fn prune_files<'a, I>(directory: &Path, notes: I) -> usize
where
    I: IntoIterator<Item = &'a Note>,
{
    let keep: HashSet<String> = notes.into_iter().map(|n| note_file_name(&n.title)).collect();
    let mut removed = 0;
    for file in read_notes(directory).iter() {
        let Some(name) = file.path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if keep.contains(name) {
            continue;
        }
        match fs::remove_file(&file.path) {
            Ok(()) => removed += 1,
            Err(e) => {
                tracing::warn!(path = %file.path.display(), error = %e, "failed to prune note file")
            }
        }
    }
    removed
}

/// A `(title, body)` pair read from one note file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFile {
    pub path: PathBuf,
    pub title: String,
    pub body: String,
}

/// Lazy, restartable view of the note files directly inside a directory.
/// Each call to [`NoteFiles::iter`] enumerates the directory afresh.
#[derive(Debug, Clone)]
pub struct NoteFiles {
    directory: PathBuf,
}

pub fn read_notes(directory: &Path) -> NoteFiles {
    NoteFiles {
        directory: directory.to_path_buf(),
    }
}

impl NoteFiles {
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn iter(&self) -> NoteFileIter {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => Some(entries),
            Err(e) => {
                tracing::warn!(directory = %self.directory.display(), error = %e, "cannot list note files");
                None
            }
        };
        NoteFileIter { entries }
    }
}

impl<'a> IntoIterator for &'a NoteFiles {
    type Item = NoteFile;
    type IntoIter = NoteFileIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct NoteFileIter {
    entries: Option<fs::ReadDir>,
}

impl Iterator for NoteFileIter {
    type Item = NoteFile;

    fn next(&mut self) -> Option<NoteFile> {
        let entries = self.entries.as_mut()?;
        for entry in entries.by_ref() {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.ends_with(NOTE_EXT) {
                continue;
            }
            let title = name.split('.').next().unwrap_or_default().to_string();
            match fs::read_to_string(&path) {
                Ok(raw) => {
                    return Some(NoteFile {
                        body: normalize_body(&raw),
                        title,
                        path,
                    })
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to read note file")
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NoteId;
    use tempfile::TempDir;

    fn note(n: usize, title: &str, body: &str) -> Note {
        Note::new(NoteId::new(n as u64).unwrap(), title, body)
    }

    #[test]
    fn test_sanitize_replaces_illegal_chars() {
        assert_eq!(sanitize_title(r#"a\b/c:d*e?f"g<h>i|j"#), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_title("plain title"), "plain title");
    }

    #[test]
    fn test_sanitize_truncates_to_250_chars() {
        let long = "é".repeat(300);
        let stem = sanitize_title(&long);
        assert_eq!(stem.chars().count(), 250);
        assert_eq!(note_file_name(&long), format!("{}.txt", stem));
    }

    #[test]
    fn test_normalize_body_appends_newline_per_line() {
        assert_eq!(normalize_body("eggs"), "eggs\n");
        assert_eq!(normalize_body("a\r\nb\n"), "a\nb\n");
        assert_eq!(normalize_body(""), "");
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let notes = vec![
            note(1, "Shopping", "milk\neggs"),
            note(2, "Ideas: big", "launch plan"),
        ];
        let report = write_notes(dir.path(), &notes);
        assert_eq!(report.written.len(), 2);
        assert!(report.failed.is_empty());

        let mut read: Vec<NoteFile> = read_notes(dir.path()).iter().collect();
        read.sort_by(|a, b| a.title.cmp(&b.title));
        assert_eq!(read.len(), 2);
        assert_eq!(read[0].title, "Ideas_ big");
        assert_eq!(read[0].body, "launch plan\n");
        assert_eq!(read[1].title, "Shopping");
        assert_eq!(read[1].body, "milk\neggs\n");
    }

    #[test]
    fn test_write_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Shopping.txt"), "old").unwrap();
        write_notes(dir.path(), &[note(1, "Shopping", "new")]);
        assert_eq!(fs::read_to_string(dir.path().join("Shopping.txt")).unwrap(), "new");
    }

    #[test]
    fn test_write_failure_does_not_block_other_notes() {
        let dir = TempDir::new().unwrap();
        // A directory squatting on the target name makes that one write fail
        fs::create_dir(dir.path().join("Blocked.txt")).unwrap();
        let notes = vec![note(1, "Blocked", "x"), note(2, "Fine", "y")];

        let report = write_notes(dir.path(), &notes);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.written.len(), 1);
        assert!(dir.path().join("Fine.txt").is_file());
    }

    #[test]
    fn test_read_skips_non_txt_and_subdirectories() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("keep.txt"), "k").unwrap();
        fs::write(dir.path().join(".metadata"), "https://x").unwrap();
        fs::write(dir.path().join("readme.md"), "r").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("deep.txt"), "d").unwrap();

        let titles: Vec<String> = read_notes(dir.path()).iter().map(|f| f.title).collect();
        assert_eq!(titles, vec!["keep".to_string()]);
    }

    #[test]
    fn test_title_strips_at_first_dot() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("v1.2 notes.txt"), "x").unwrap();
        let files: Vec<NoteFile> = read_notes(dir.path()).iter().collect();
        assert_eq!(files[0].title, "v1");
    }

    #[test]
    fn test_read_is_restartable() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "1").unwrap();
        let files = read_notes(dir.path());
        assert_eq!(files.iter().count(), 1);

        fs::write(dir.path().join("b.txt"), "2").unwrap();
        assert_eq!(files.iter().count(), 2);
    }

    #[test]
    fn test_read_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_notes(&dir.path().join("nope")).iter().count(), 0);
    }

    #[test]
    fn test_prune_removes_files_without_notes() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Gone.txt"), "x").unwrap();
        fs::write(dir.path().join("Kept.txt"), "y").unwrap();
        fs::write(dir.path().join(".metadata"), "link").unwrap();

        let removed = prune_files(dir.path(), &[note(1, "Kept", "y")]);
        assert_eq!(removed, 1);
        assert!(!dir.path().join("Gone.txt").exists());
        assert!(dir.path().join("Kept.txt").exists());
        assert!(dir.path().join(".metadata").exists());
    }
}
