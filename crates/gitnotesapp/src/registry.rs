//! # Repository Registry
//!
//! Discovers git working trees under the repositories root and remembers
//! each one's remote link.
//!
//! ## Discovery
//!
//! [`scan`] walks the root depth-first. A directory holding a `.git` entry is
//! recorded and not descended into; every other directory is descended into.
//! Symlinked directories are not followed. The root itself is never recorded.
//!
//! ```text
//! repos/
//! ├── notes/            # recorded
//! │   ├── .git/
//! │   ├── .metadata      # "https://github.com/user/notes.git"
//! │   └── inner/.git/   # not visited
//! └── work/
//!     └── journal/      # recorded, link = missing sentinel
//!         └── .git/
//! ```
//!
//! `scan` is pure: it returns a fresh [`RepoMap`]. [`RepositoryRegistry`]
//! replaces its map wholesale on every rescan, so observers never see a
//! half-built mapping.
//!
//! ## Metadata Sidecar
//!
//! `.metadata` holds a single line, the remote link. Reading takes the first
//! line; saving overwrites the file. Both are best-effort: a lost sidecar
//! degrades what is shown for a repository but never touches notes.

use crate::model::{repo_dir_name, RepoMap, Repository};
use std::fs;
use std::path::{Path, PathBuf};

pub const METADATA_FILE: &str = ".metadata";
const GIT_DIR: &str = ".git";

/// Map every working tree under `root` to its remote link, using `missing`
/// for trees without a readable sidecar.
pub fn scan(root: &Path, missing: &str) -> RepoMap {
    let mut found = RepoMap::new();
    visit(root, missing, &mut found);
    tracing::debug!(root = %root.display(), count = found.len(), "repository scan finished");
    found
}

fn visit(directory: &Path, missing: &str, found: &mut RepoMap) {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(directory = %directory.display(), error = %e, "skipping unreadable directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir {
            continue;
        }
        let path = entry.path();
        if path.join(GIT_DIR).exists() {
            let link = read_metadata(&path, missing);
            found.insert(path, link);
        } else {
            visit(&path, missing, found);
        }
    }
}

/// First line of the sidecar, or `missing`.
pub fn read_metadata(repository: &Path, missing: &str) -> String {
    match fs::read_to_string(repository.join(METADATA_FILE)) {
        Ok(contents) => match contents.lines().next() {
            Some(line) => line.to_string(),
            None => missing.to_string(),
        },
        Err(_) => missing.to_string(),
    }
}

/// Overwrite the sidecar with `link`. Failures are logged, never returned.
pub fn save_metadata(repository: &Path, link: &str) {
    let path = repository.join(METADATA_FILE);
    if let Err(e) = fs::write(&path, link) {
        tracing::warn!(path = %path.display(), error = %e, "failed to save repository metadata");
    }
}

/// True when `path` has a `.git` directory.
pub fn is_git(path: &Path) -> bool {
    path.join(GIT_DIR).is_dir()
}

/// Recursively delete `path`. Keeps going past failures and returns `false`
/// if any entry could not be removed, including `path` itself.
pub fn remove(path: &Path) -> bool {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot remove");
            return false;
        }
    };

    if !metadata.is_dir() {
        return match fs::remove_file(path) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove file");
                false
            }
        };
    }

    let mut complete = true;
    match fs::read_dir(path) {
        Ok(entries) => {
            for entry in entries {
                match entry {
                    Ok(entry) => complete &= remove(&entry.path()),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "failed to list entry");
                        complete = false;
                    }
                }
            }
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to list directory");
            complete = false;
        }
    }

    if let Err(e) = fs::remove_dir(path) {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove directory");
        complete = false;
    }
    complete
}

/// Working tree name for a remote URL: the last path segment without a
/// trailing `.git`. Handles scp-like `git@host:repo.git` too.
pub fn extract_repo_name(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    let segment = trimmed.rsplit(|c: char| c == '/' || c == ':').next().unwrap_or_default();
    segment.strip_suffix(".git").unwrap_or(segment).to_string()
}

/// The set of known working trees under one root.
pub struct RepositoryRegistry {
    root: PathBuf,
    missing: String,
    repos: RepoMap,
}

impl RepositoryRegistry {
    /// Create the registry and run the first scan.
    pub fn open(root: impl Into<PathBuf>, missing: impl Into<String>) -> Self {
        let mut registry = Self {
            root: root.into(),
            missing: missing.into(),
            repos: RepoMap::new(),
        };
        registry.rescan();
        registry
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn missing_link(&self) -> &str {
        &self.missing
    }

    /// Replace the mapping with a fresh scan of the root.
    pub fn rescan(&mut self) -> &RepoMap {
        self.repos = scan(&self.root, &self.missing);
        &self.repos
    }

    pub fn map(&self) -> &RepoMap {
        &self.repos
    }

    pub fn list(&self) -> Vec<Repository> {
        self.repos
            .iter()
            .map(|(path, link)| Repository {
                path: path.clone(),
                remote_link: link.clone(),
            })
            .collect()
    }

    pub fn get(&self, path: &Path) -> Option<Repository> {
        self.repos.get(path).map(|link| Repository {
            path: path.to_path_buf(),
            remote_link: link.clone(),
        })
    }

    /// Resolve a repository by path, or by directory name. A name shared by
    /// nested trees resolves to the top-level one when it exists.
    pub fn find(&self, name_or_path: &str) -> Option<Repository> {
        let as_path = Path::new(name_or_path);
        if let Some(repo) = self.get(as_path) {
            return Some(repo);
        }
        if let Some(repo) = self.get(&self.path_for(name_or_path)) {
            return Some(repo);
        }
        self.list()
            .into_iter()
            .find(|repo| repo_dir_name(&repo.path) == name_or_path)
    }

    /// Where a working tree named `name` lives under the root.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn save_metadata(&self, repository: &Path, link: &str) {
        save_metadata(repository, link)
    }

    /// Delete a working tree and rescan. Returns whether the delete was complete.
    pub fn remove(&mut self, repository: &Path) -> bool {
        let removed = remove(repository);
        self.rescan();
        removed
    }
}
