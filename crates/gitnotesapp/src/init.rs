//! # Startup
//!
//! Wires the durable pieces together: data directory, configuration, note
//! store, credential store, repositories root and the git worker pool.
//!
//! ## Data Directory
//!
//! Resolved in order:
//! 1. An explicit override (the CLI's `--data` flag)
//! 2. The `GITNOTES_HOME` environment variable
//! 3. The OS data directory for `gitnotes` (via the `directories` crate)
//!
//! Working trees live in `<data dir>/repos/`.

use crate::api::GitNotesApi;
use crate::config::GitNotesConfig;
use crate::credentials::FsCredentialStore;
use crate::error::{GitNotesError, Result};
use crate::git::{Git2Capability, GitPipeline};
use crate::registry::RepositoryRegistry;
use crate::store::fs_backend::FsBackend;
use crate::store::NoteStore;
use crate::sync::SyncOrchestrator;
use clapfig::{Clapfig, SearchMode, SearchPath};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const HOME_ENV: &str = "GITNOTES_HOME";
pub const CONFIG_FILE: &str = "gitnotes.toml";
pub const REPOS_DIR: &str = "repos";

pub struct GitNotesContext {
    pub api: GitNotesApi<FsBackend, FsCredentialStore>,
    pub config: GitNotesConfig,
    pub data_dir: PathBuf,
}

/// Where gitnotes keeps its data, honoring the override and `GITNOTES_HOME`.
pub fn data_dir(data_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = data_override {
        return Ok(path);
    }
    if let Some(path) = std::env::var_os(HOME_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    ProjectDirs::from("com", "gitnotes", "gitnotes")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| GitNotesError::Api("Could not determine the data directory".to_string()))
}

pub fn load_config(data_dir: &Path) -> GitNotesConfig {
    Clapfig::builder()
        .app_name("gitnotes")
        .file_name(CONFIG_FILE)
        .search_paths(vec![SearchPath::Path(data_dir.to_path_buf())])
        .search_mode(SearchMode::Merge)
        .load()
        .unwrap_or_default()
}

/// Build the full context over the data directory.
pub fn initialize(data_override: Option<PathBuf>) -> Result<GitNotesContext> {
    let data_dir = data_dir(data_override)?;
    let repos_root = data_dir.join(REPOS_DIR);
    fs::create_dir_all(&repos_root)?;

    let config = load_config(&data_dir);
    tracing::debug!(data_dir = %data_dir.display(), ?config, "gitnotes initialized");

    let store = NoteStore::open(FsBackend::new(data_dir.clone()))?;
    let registry = RepositoryRegistry::open(repos_root, config.missing_link.clone());
    let git = Git2Capability::new(config.author_name.clone(), config.author_email.clone())
        .with_transfer_timeout(config.transfer_timeout());
    let pipeline = GitPipeline::new(Arc::new(git), config.worker_threads());
    let credentials = FsCredentialStore::new(data_dir.clone());

    let sync = SyncOrchestrator::new(store, registry, pipeline, credentials, config.clone());
    Ok(GitNotesContext {
        api: GitNotesApi::new(sync),
        config,
        data_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_initialize_with_override_creates_layout() {
        let temp = TempDir::new().unwrap();
        let data = temp.path().join("data");

        let ctx = initialize(Some(data.clone())).unwrap();

        assert_eq!(ctx.data_dir, data);
        assert!(data.join(REPOS_DIR).is_dir());
        assert_eq!(ctx.api.sync().registry().root(), data.join(REPOS_DIR));
        assert_eq!(ctx.config, GitNotesConfig::default());
    }

    #[test]
    fn test_config_file_is_merged() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE),
            "worker_threads = 4\nmissing_link = \"unlinked\"\n",
        )
        .unwrap();

        let config = load_config(temp.path());
        assert_eq!(config.worker_threads(), 4);
        assert_eq!(config.missing_link, "unlinked");
        assert_eq!(config.transfer_timeout_secs, 120);
    }

    #[test]
    fn test_notes_survive_restart() {
        let temp = TempDir::new().unwrap();
        {
            let mut ctx = initialize(Some(temp.path().to_path_buf())).unwrap();
            ctx.api.add_note("Shopping", "milk").unwrap();
        }
        let ctx = initialize(Some(temp.path().to_path_buf())).unwrap();
        let listed = ctx.api.list_notes().unwrap().listed_notes;
        assert_eq!(listed[0].title, "Shopping");
    }
}
