//! Scripted git capability for exercising pipeline and orchestrator ordering
//! without a network or real repositories.

use crate::config::GitNotesConfig;
use crate::credentials::{Credentials, MemCredentialStore};
use crate::git::{GitCapability, GitError, GitPipeline, InitStatus, TransferOptions};
use crate::registry::RepositoryRegistry;
use crate::store::mem_backend::MemBackend;
use crate::store::NoteStore;
use crate::sync::SyncOrchestrator;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeStep {
    Init,
    Stage,
    Commit,
    Push,
    Pull,
    Clone,
}

impl FakeStep {
    pub fn name(self) -> &'static str {
        match self {
            FakeStep::Init => "init",
            FakeStep::Stage => "stage",
            FakeStep::Commit => "commit",
            FakeStep::Push => "push",
            FakeStep::Pull => "pull",
            FakeStep::Clone => "clone",
        }
    }
}

/// Records every call. Steps can be told to fail, panic or sleep. Pull and
/// clone drop the configured remote files into the working tree, and `init`
/// and `clone` create a `.git` directory so registry scans see the result.
#[derive(Default)]
pub struct FakeGit {
    calls: Mutex<Vec<FakeStep>>,
    failures: Mutex<HashSet<FakeStep>>,
    panics: Mutex<HashSet<FakeStep>>,
    delays: Mutex<HashMap<FakeStep, Duration>>,
    remote_files: Mutex<Vec<(String, String)>>,
    credentials: Mutex<Vec<Credentials>>,
    pushes: Mutex<Vec<(String, TransferOptions)>>,
}

fn scripted(step: FakeStep) -> git2::Error {
    git2::Error::from_str(&format!("scripted {} failure", step.name()))
}

impl FakeGit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, step: FakeStep) {
        self.failures.lock().unwrap().insert(step);
    }

    pub fn panic_on(&self, step: FakeStep) {
        self.panics.lock().unwrap().insert(step);
    }

    pub fn set_delay(&self, step: FakeStep, delay: Duration) {
        self.delays.lock().unwrap().insert(step, delay);
    }

    /// Files (`file name`, `contents`) that pull and clone write.
    pub fn set_remote_files(&self, files: &[(&str, &str)]) {
        *self.remote_files.lock().unwrap() = files
            .iter()
            .map(|(name, body)| (name.to_string(), body.to_string()))
            .collect();
    }

    pub fn calls(&self) -> Vec<FakeStep> {
        self.calls.lock().unwrap().clone()
    }

    /// Credentials seen by network steps, in call order.
    pub fn credentials_seen(&self) -> Vec<Credentials> {
        self.credentials.lock().unwrap().clone()
    }

    pub fn pushes(&self) -> Vec<(String, TransferOptions)> {
        self.pushes.lock().unwrap().clone()
    }

    fn enter(&self, step: FakeStep) -> Result<(), git2::Error> {
        self.calls.lock().unwrap().push(step);
        let delay = self.delays.lock().unwrap().get(&step).copied();
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        if self.panics.lock().unwrap().contains(&step) {
            panic!("fake git panicked during {}", step.name());
        }
        if self.failures.lock().unwrap().contains(&step) {
            return Err(scripted(step));
        }
        Ok(())
    }

    fn write_remote_files(&self, path: &Path) -> Result<(), GitError> {
        for (name, body) in self.remote_files.lock().unwrap().iter() {
            fs::write(path.join(name), body)?;
        }
        Ok(())
    }
}

impl GitCapability for FakeGit {
    fn init(&self, path: &Path) -> Result<InitStatus, GitError> {
        self.enter(FakeStep::Init)
            .map_err(|e| GitError::Init(path.to_path_buf(), e))?;
        let git_dir = path.join(".git");
        if git_dir.exists() {
            return Ok(InitStatus::Exists);
        }
        fs::create_dir_all(git_dir)?;
        Ok(InitStatus::Created)
    }

    fn stage(&self, _path: &Path, _pattern: &str) -> Result<(), GitError> {
        self.enter(FakeStep::Stage).map_err(GitError::Stage)
    }

    fn commit(&self, _path: &Path, _message: &str) -> Result<(), GitError> {
        self.enter(FakeStep::Commit).map_err(GitError::Commit)
    }

    fn push(
        &self,
        _path: &Path,
        remote: &str,
        credentials: &Credentials,
        options: TransferOptions,
    ) -> Result<(), GitError> {
        self.credentials.lock().unwrap().push(credentials.clone());
        self.enter(FakeStep::Push).map_err(GitError::Push)?;
        self.pushes.lock().unwrap().push((remote.to_string(), options));
        Ok(())
    }

    fn pull(
        &self,
        path: &Path,
        _remote: &str,
        credentials: &Credentials,
        _options: TransferOptions,
    ) -> Result<(), GitError> {
        self.credentials.lock().unwrap().push(credentials.clone());
        self.enter(FakeStep::Pull).map_err(GitError::Fetch)?;
        self.write_remote_files(path)
    }

    fn clone_repo(
        &self,
        remote: &str,
        credentials: &Credentials,
        destination: &Path,
        _options: TransferOptions,
    ) -> Result<(), GitError> {
        self.credentials.lock().unwrap().push(credentials.clone());
        self.enter(FakeStep::Clone).map_err(|source| GitError::Clone {
            url: remote.to_string(),
            source,
        })?;
        fs::create_dir_all(destination.join(".git"))?;
        self.write_remote_files(destination)
    }
}

/// An orchestrator over in-memory notes and credentials, a [`FakeGit`] and a
/// temporary repositories root.
pub struct TestSync {
    // Keeps the root alive for the test's duration
    pub _temp_dir: tempfile::TempDir,
    pub root: PathBuf,
    pub fake: Arc<FakeGit>,
    pub sync: SyncOrchestrator<MemBackend, MemCredentialStore>,
}

impl Default for TestSync {
    fn default() -> Self {
        Self::new()
    }
}

impl TestSync {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        let fake = Arc::new(FakeGit::new());
        let config = GitNotesConfig::default();
        let sync = SyncOrchestrator::new(
            NoteStore::open(MemBackend::new()).expect("memory store opens"),
            RepositoryRegistry::open(root.clone(), config.missing_link.clone()),
            GitPipeline::new(fake.clone(), config.worker_threads()),
            MemCredentialStore::new(),
            config,
        );
        Self {
            _temp_dir: temp_dir,
            root,
            fake,
            sync,
        }
    }
}
