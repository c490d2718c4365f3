//! # Sync Orchestrator
//!
//! Composes the git pipeline, the note file codec and reconciliation into the
//! four user-facing flows. Each flow runs as a small state machine per
//! working tree:
//!
//! ```text
//! create:  Idle → Initializing → Idle
//! push:    Idle → Staging → Committing → Transferring → Idle
//! pull:    Idle → Transferring → Reconciling → Idle
//! clone:   Idle → Transferring → Reconciling → Idle
//! ```
//!
//! A stage starts only after the previous one reported success. The first
//! failure ends the flow, reports the causing error and returns to `Idle`.
//!
//! ## Threads
//!
//! Git work runs on the pipeline's workers. Their completion callbacks only
//! send a message over a channel. The orchestrator drains that channel in
//! [`SyncOrchestrator::poll`] and [`SyncOrchestrator::wait`] on its owner's
//! thread, and only there touches the note store, the registry or the
//! working tree files. Observers see a consistent store at all times.
//!
//! ## One Flow Per Repository
//!
//! A second flow for a working tree that already has one in flight is
//! rejected with [`GitNotesError::RepoBusy`]. Flows on different working
//! trees run independently.
//!
//! ## Validation First
//!
//! Every flow validates names, URLs and credentials before any filesystem or
//! network work, so a rejected call changes nothing.

use crate::codec;
use crate::config::GitNotesConfig;
use crate::credentials::{CredentialStore, Credentials};
use crate::error::{GitNotesError, Result};
use crate::git::{GitError, GitPipeline, InitStatus, TransferOptions};
use crate::model::Repository;
use crate::reconcile::{self, ReconcileReport};
use crate::registry::{self, RepositoryRegistry};
use crate::store::backend::NoteBackend;
use crate::store::NoteStore;
use crate::validate;
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Handle for one submitted flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowTicket(u64);

impl fmt::Display for FlowTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    Create,
    Push,
    Pull,
    Clone,
}

impl FlowKind {
    pub fn name(self) -> &'static str {
        match self {
            FlowKind::Create => "create",
            FlowKind::Push => "push",
            FlowKind::Pull => "pull",
            FlowKind::Clone => "clone",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoState {
    Idle,
    Initializing,
    Staging,
    Committing,
    Transferring,
    Reconciling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    Initialized(InitStatus),
    Pushed,
    Pulled(ReconcileReport),
    Cloned(ReconcileReport),
}

/// Final result of a flow, delivered once.
#[derive(Debug)]
pub struct FlowReport {
    pub ticket: FlowTicket,
    pub kind: FlowKind,
    pub repository: PathBuf,
    pub result: Result<FlowOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    StateChanged {
        repository: PathBuf,
        state: RepoState,
    },
    RepositoriesChanged,
    FlowFinished {
        ticket: FlowTicket,
        kind: FlowKind,
        repository: PathBuf,
        succeeded: bool,
    },
}

/// A git step finishing on a worker.
enum StepDone {
    Init(std::result::Result<InitStatus, GitError>),
    Stage(std::result::Result<(), GitError>),
    Commit(std::result::Result<(), GitError>),
    Push(std::result::Result<(), GitError>),
    Pull(std::result::Result<(), GitError>),
    Clone(std::result::Result<(), GitError>),
}

struct Completion {
    ticket: FlowTicket,
    step: StepDone,
}

struct Flow {
    kind: FlowKind,
    repository: PathBuf,
    state: RepoState,
    remote: Option<String>,
    credentials: Credentials,
    options: TransferOptions,
}

pub struct SyncOrchestrator<B: NoteBackend, C: CredentialStore> {
    store: NoteStore<B>,
    registry: RepositoryRegistry,
    pipeline: GitPipeline,
    credentials: C,
    config: GitNotesConfig,
    flows: HashMap<FlowTicket, Flow>,
    busy: HashMap<PathBuf, FlowTicket>,
    finished: Vec<FlowReport>,
    next_ticket: u64,
    completions_tx: Sender<Completion>,
    completions_rx: Receiver<Completion>,
    subscribers: Vec<Sender<SyncEvent>>,
}

impl<B: NoteBackend, C: CredentialStore> SyncOrchestrator<B, C> {
    pub fn new(
        store: NoteStore<B>,
        registry: RepositoryRegistry,
        pipeline: GitPipeline,
        credentials: C,
        config: GitNotesConfig,
    ) -> Self {
        let (completions_tx, completions_rx) = unbounded();
        Self {
            store,
            registry,
            pipeline,
            credentials,
            config,
            flows: HashMap::new(),
            busy: HashMap::new(),
            finished: Vec::new(),
            next_ticket: 1,
            completions_tx,
            completions_rx,
            subscribers: Vec::new(),
        }
    }

    pub fn store(&self) -> &NoteStore<B> {
        &self.store
    }

    /// Direct note edits. Only valid on the orchestrator's thread, which is
    /// the only thread that can hold `&mut self`.
    pub fn store_mut(&mut self) -> &mut NoteStore<B> {
        &mut self.store
    }

    pub fn registry(&self) -> &RepositoryRegistry {
        &self.registry
    }

    pub fn config(&self) -> &GitNotesConfig {
        &self.config
    }

    pub fn credential_store(&self) -> &C {
        &self.credentials
    }

    pub fn subscribe(&mut self) -> Receiver<SyncEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: SyncEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// State of the flow running on `repository`, `Idle` when none is.
    pub fn state_of(&self, repository: &Path) -> RepoState {
        self.busy
            .get(repository)
            .and_then(|ticket| self.flows.get(ticket))
            .map(|flow| flow.state)
            .unwrap_or(RepoState::Idle)
    }

    pub fn in_flight(&self) -> usize {
        self.flows.len()
    }

    // --- Credentials ---

    /// Validate and store credentials. Nothing is stored when either value
    /// is malformed.
    pub fn login(&self, username: Option<&str>, token: &str) -> Result<()> {
        let token = validate::token(token)?;
        let username = username.map(validate::username).transpose()?;
        if let Some(username) = username {
            self.credentials.set_username(username)?;
        }
        self.credentials.set_token(token)?;
        tracing::info!(username = ?username, "credentials stored");
        Ok(())
    }

    /// Credentials for a transfer with `remote`. Network remotes need a token.
    fn credentials_for(&self, remote: &str) -> Result<Credentials> {
        let credentials = self.credentials.load()?;
        if !validate::is_local_remote(remote) && !credentials.has_token() {
            return Err(GitNotesError::validation(
                "No access token stored. Run `gitnotes login --token <TOKEN>` first.",
            ));
        }
        Ok(credentials)
    }

    fn transfer_options(&self, force: bool) -> TransferOptions {
        TransferOptions {
            force,
            deadline: self.config.transfer_timeout(),
        }
    }

    // --- Repositories ---

    pub fn repositories(&self) -> Vec<Repository> {
        self.registry.list()
    }

    pub fn rescan(&mut self) {
        self.registry.rescan();
        self.emit(SyncEvent::RepositoriesChanged);
    }

    fn resolve(&self, name_or_path: &str) -> Result<Repository> {
        let repository = self
            .registry
            .find(name_or_path.trim())
            .ok_or_else(|| GitNotesError::UnknownRepository(name_or_path.to_string()))?;
        if !registry::is_git(&repository.path) {
            return Err(GitNotesError::validation(format!(
                "{} is not a git working tree",
                repository.path.display()
            )));
        }
        Ok(repository)
    }

    fn ensure_idle(&self, repository: &Path) -> Result<()> {
        if self.busy.contains_key(repository) {
            return Err(GitNotesError::RepoBusy(repository.to_path_buf()));
        }
        Ok(())
    }

    /// Delete a working tree. Returns whether every entry was removed.
    pub fn remove_repository(&mut self, name_or_path: &str) -> Result<bool> {
        let repository = self
            .registry
            .find(name_or_path.trim())
            .ok_or_else(|| GitNotesError::UnknownRepository(name_or_path.to_string()))?;
        self.ensure_idle(&repository.path)?;
        let removed = self.registry.remove(&repository.path);
        self.emit(SyncEvent::RepositoriesChanged);
        Ok(removed)
    }

    // --- Flows ---

    fn start(
        &mut self,
        kind: FlowKind,
        repository: PathBuf,
        state: RepoState,
        remote: Option<String>,
        credentials: Credentials,
        options: TransferOptions,
    ) -> FlowTicket {
        let ticket = FlowTicket(self.next_ticket);
        self.next_ticket += 1;
        self.busy.insert(repository.clone(), ticket);
        self.flows.insert(
            ticket,
            Flow {
                kind,
                repository: repository.clone(),
                state,
                remote,
                credentials,
                options,
            },
        );
        tracing::info!(%ticket, flow = kind.name(), repo = %repository.display(), "flow started");
        self.emit(SyncEvent::StateChanged { repository, state });
        ticket
    }

    fn notifier<T>(
        &self,
        ticket: FlowTicket,
        wrap: fn(std::result::Result<T, GitError>) -> StepDone,
    ) -> impl FnOnce(std::result::Result<T, GitError>) + Send + 'static
    where
        T: Send + 'static,
    {
        let tx = self.completions_tx.clone();
        move |result| {
            let _ = tx.send(Completion {
                ticket,
                step: wrap(result),
            });
        }
    }

    /// Initialize `<root>/<name>`. On a fresh repository the current notes are
    /// written into it. An existing one is reused untouched. `remote` becomes
    /// the repository's link when given.
    pub fn create_repository(&mut self, name: &str, remote: Option<&str>) -> Result<FlowTicket> {
        let name = validate::repo_name(name)?.to_string();
        let remote = remote.map(validate::remote_url).transpose()?.map(str::to_string);
        let path = self.registry.path_for(&name);
        self.ensure_idle(&path)?;

        let ticket = self.start(
            FlowKind::Create,
            path,
            RepoState::Initializing,
            remote,
            Credentials::default(),
            TransferOptions::default(),
        );
        let done = self.notifier(ticket, StepDone::Init);
        self.pipeline.init(self.registry.root(), &name, done);
        Ok(ticket)
    }

    /// Write notes, then stage, commit and push to the repository's link.
    pub fn push(&mut self, name_or_path: &str, force: bool) -> Result<FlowTicket> {
        let repository = self.resolve(name_or_path)?;
        if repository.remote_link == self.registry.missing_link() {
            return Err(GitNotesError::validation(format!(
                "Repository {} has no remote link. Pull from a remote or create it with one.",
                repository.name()
            )));
        }
        let remote = validate::remote_url(&repository.remote_link)?.to_string();
        let credentials = self.credentials_for(&remote)?;
        self.ensure_idle(&repository.path)?;

        if self.config.prune_deleted {
            let pruned = codec::prune_files(&repository.path, self.store.notes());
            tracing::debug!(pruned, "stale note files removed");
        }
        codec::write_notes(&repository.path, self.store.notes());

        let options = self.transfer_options(force);
        let ticket = self.start(
            FlowKind::Push,
            repository.path.clone(),
            RepoState::Staging,
            Some(remote),
            credentials,
            options,
        );
        let done = self.notifier(ticket, StepDone::Stage);
        self.pipeline.stage(&repository.path, ".", done);
        Ok(ticket)
    }

    /// Fetch and fast-forward from `remote` (default: the stored link), then
    /// reconcile the working tree's files into the store.
    pub fn pull(&mut self, name_or_path: &str, remote: Option<&str>) -> Result<FlowTicket> {
        let repository = self.resolve(name_or_path)?;
        let remote = match remote {
            Some(remote) => remote,
            None if repository.remote_link == self.registry.missing_link() => {
                return Err(GitNotesError::validation(format!(
                    "Repository {} has no remote link. Pass the remote URL to pull from.",
                    repository.name()
                )));
            }
            None => repository.remote_link.as_str(),
        };
        let remote = validate::remote_url(remote)?.to_string();
        let credentials = self.credentials_for(&remote)?;
        self.ensure_idle(&repository.path)?;

        let options = self.transfer_options(false);
        let ticket = self.start(
            FlowKind::Pull,
            repository.path.clone(),
            RepoState::Transferring,
            Some(remote.clone()),
            credentials.clone(),
            options,
        );
        let done = self.notifier(ticket, StepDone::Pull);
        self.pipeline
            .pull(&repository.path, &remote, credentials, options, done);
        Ok(ticket)
    }

    /// Clone `url` into `<root>/<name from url>` and reconcile its files.
    pub fn clone_repository(&mut self, url: &str) -> Result<FlowTicket> {
        let url = validate::remote_url(url)?.to_string();
        let name = registry::extract_repo_name(&url);
        let name = validate::repo_name(&name)?.to_string();
        let destination = self.registry.path_for(&name);
        if destination.exists() {
            return Err(GitNotesError::validation(format!(
                "A repository named {} already exists",
                name
            )));
        }
        let credentials = self.credentials_for(&url)?;
        self.ensure_idle(&destination)?;
        fs::create_dir_all(self.registry.root())?;

        let options = self.transfer_options(false);
        let ticket = self.start(
            FlowKind::Clone,
            destination.clone(),
            RepoState::Transferring,
            Some(url.clone()),
            credentials.clone(),
            options,
        );
        let done = self.notifier(ticket, StepDone::Clone);
        self.pipeline
            .clone_repo(&url, credentials, &destination, options, done);
        Ok(ticket)
    }

    // --- Completion handling ---

    fn set_state(&mut self, ticket: FlowTicket, state: RepoState) {
        if let Some(flow) = self.flows.get_mut(&ticket) {
            flow.state = state;
            let repository = flow.repository.clone();
            self.emit(SyncEvent::StateChanged { repository, state });
        }
    }

    fn finish(&mut self, ticket: FlowTicket, result: Result<FlowOutcome>) -> Option<FlowReport> {
        let flow = self.flows.remove(&ticket)?;
        self.busy.remove(&flow.repository);

        match &result {
            Ok(_) => tracing::info!(%ticket, flow = flow.kind.name(), "flow finished"),
            Err(e) => tracing::warn!(%ticket, flow = flow.kind.name(), error = %e, "flow failed"),
        }
        self.emit(SyncEvent::StateChanged {
            repository: flow.repository.clone(),
            state: RepoState::Idle,
        });
        self.emit(SyncEvent::FlowFinished {
            ticket,
            kind: flow.kind,
            repository: flow.repository.clone(),
            succeeded: result.is_ok(),
        });
        Some(FlowReport {
            ticket,
            kind: flow.kind,
            repository: flow.repository,
            result,
        })
    }

    /// Save the link, rescan and reconcile after a successful transfer.
    fn integrate(&mut self, ticket: FlowTicket) -> Result<ReconcileReport> {
        let (repository, remote) = match self.flows.get(&ticket) {
            Some(flow) => (flow.repository.clone(), flow.remote.clone()),
            None => return Err(GitNotesError::Api(format!("unknown flow {}", ticket))),
        };
        self.set_state(ticket, RepoState::Reconciling);
        if let Some(remote) = remote {
            registry::save_metadata(&repository, &remote);
        }
        self.rescan();
        reconcile::reconcile_directory(&mut self.store, &codec::read_notes(&repository))
    }

    /// Advance the flow a completion belongs to. Returns the report when the
    /// flow ended.
    fn advance(&mut self, completion: Completion) -> Option<FlowReport> {
        let ticket = completion.ticket;
        let (repository, remote, credentials, options) = {
            let flow = self.flows.get(&ticket)?;
            (
                flow.repository.clone(),
                flow.remote.clone(),
                flow.credentials.clone(),
                flow.options,
            )
        };

        match completion.step {
            StepDone::Init(Ok(status)) => {
                if status == InitStatus::Created {
                    codec::write_notes(&repository, self.store.notes());
                }
                if let Some(remote) = remote {
                    registry::save_metadata(&repository, &remote);
                }
                self.rescan();
                self.finish(ticket, Ok(FlowOutcome::Initialized(status)))
            }
            StepDone::Stage(Ok(())) => {
                self.set_state(ticket, RepoState::Committing);
                let message = self.config.commit_message();
                let done = self.notifier(ticket, StepDone::Commit);
                self.pipeline.commit(&repository, &message, done);
                None
            }
            StepDone::Commit(Ok(())) => {
                self.set_state(ticket, RepoState::Transferring);
                let Some(remote) = remote else {
                    return self.finish(
                        ticket,
                        Err(GitNotesError::Api("push flow lost its remote".to_string())),
                    );
                };
                let done = self.notifier(ticket, StepDone::Push);
                self.pipeline
                    .push(&repository, &remote, credentials, options, done);
                None
            }
            StepDone::Push(Ok(())) => {
                self.rescan();
                self.finish(ticket, Ok(FlowOutcome::Pushed))
            }
            StepDone::Pull(Ok(())) => {
                let result = self.integrate(ticket).map(FlowOutcome::Pulled);
                self.finish(ticket, result)
            }
            StepDone::Clone(Ok(())) => {
                let result = self.integrate(ticket).map(FlowOutcome::Cloned);
                self.finish(ticket, result)
            }
            StepDone::Clone(Err(e)) => {
                // Leave no half-cloned tree behind for the next scan
                if repository.exists() && !registry::remove(&repository) {
                    tracing::warn!(repo = %repository.display(), "failed to clean up after clone");
                }
                self.finish(ticket, Err(e.into()))
            }
            StepDone::Init(Err(e))
            | StepDone::Stage(Err(e))
            | StepDone::Commit(Err(e))
            | StepDone::Push(Err(e))
            | StepDone::Pull(Err(e)) => self.finish(ticket, Err(e.into())),
        }
    }

    /// Handle every completion that has arrived, without blocking. Returns
    /// reports for flows that ended.
    pub fn poll(&mut self) -> Vec<FlowReport> {
        while let Ok(completion) = self.completions_rx.try_recv() {
            if let Some(report) = self.advance(completion) {
                self.finished.push(report);
            }
        }
        std::mem::take(&mut self.finished)
    }

    fn take_finished(&mut self, ticket: FlowTicket) -> Option<FlowReport> {
        let index = self.finished.iter().position(|r| r.ticket == ticket)?;
        Some(self.finished.remove(index))
    }

    /// Block until `ticket`'s flow ends. Reports for other flows that end
    /// meanwhile are kept for the next [`poll`](Self::poll).
    pub fn wait(&mut self, ticket: FlowTicket) -> Result<FlowReport> {
        loop {
            if let Some(report) = self.take_finished(ticket) {
                return Ok(report);
            }
            if !self.flows.contains_key(&ticket) {
                return Err(GitNotesError::Api(format!("no flow {} to wait for", ticket)));
            }
            let completion = self
                .completions_rx
                .recv()
                .map_err(|e| GitNotesError::Api(e.to_string()))?;
            if let Some(report) = self.advance(completion) {
                self.finished.push(report);
            }
        }
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`, returning `None`.
    /// The flow keeps running.
    pub fn wait_timeout(&mut self, ticket: FlowTicket, timeout: Duration) -> Result<Option<FlowReport>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(report) = self.take_finished(ticket) {
                return Ok(Some(report));
            }
            if !self.flows.contains_key(&ticket) {
                return Err(GitNotesError::Api(format!("no flow {} to wait for", ticket)));
            }
            match self.completions_rx.recv_deadline(deadline) {
                Ok(completion) => {
                    if let Some(report) = self.advance(completion) {
                        self.finished.push(report);
                    }
                }
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(GitNotesError::Api("completion channel closed".to_string()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemCredentialStore;
    use crate::registry::METADATA_FILE;
    use crate::store::mem_backend::MemBackend;
    use crate::test_utils::{FakeGit, FakeStep};
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    type TestOrchestrator = SyncOrchestrator<MemBackend, MemCredentialStore>;

    fn token() -> String {
        format!("ghp_{}", "a1".repeat(18))
    }

    fn setup() -> (TempDir, Arc<FakeGit>, TestOrchestrator) {
        let root = TempDir::new().unwrap();
        let fake = Arc::new(FakeGit::new());
        let config = GitNotesConfig::default();
        let orchestrator = SyncOrchestrator::new(
            NoteStore::open(MemBackend::new()).unwrap(),
            RepositoryRegistry::open(root.path(), config.missing_link.clone()),
            GitPipeline::new(fake.clone(), 2),
            MemCredentialStore::new(),
            config,
        );
        (root, fake, orchestrator)
    }

    fn remote_url(root: &TempDir) -> String {
        format!("file://{}/remotes/shared.git", root.path().display())
    }

    /// Create `name` linked to a local remote and wait for it.
    fn create_linked(orchestrator: &mut TestOrchestrator, root: &TempDir, name: &str) -> PathBuf {
        let ticket = orchestrator
            .create_repository(name, Some(&remote_url(root)))
            .unwrap();
        orchestrator.wait(ticket).unwrap().result.unwrap();
        root.path().join(name)
    }

    // --- Create ---

    #[test]
    fn test_create_twice_reports_created_then_exists() {
        let (root, _fake, mut orchestrator) = setup();
        orchestrator.store_mut().insert("Shopping", "milk").unwrap();

        let first = orchestrator.create_repository("notes", None).unwrap();
        let report = orchestrator.wait(first).unwrap();
        assert_eq!(
            report.result.unwrap(),
            FlowOutcome::Initialized(InitStatus::Created)
        );
        let file = root.path().join("notes").join("Shopping.txt");
        assert_eq!(fs::read_to_string(&file).unwrap(), "milk");
        assert_eq!(orchestrator.repositories().len(), 1);

        // Second create reuses the tree and leaves its files alone
        fs::write(&file, "edited elsewhere").unwrap();
        let second = orchestrator.create_repository("notes", None).unwrap();
        let report = orchestrator.wait(second).unwrap();
        assert_eq!(
            report.result.unwrap(),
            FlowOutcome::Initialized(InitStatus::Exists)
        );
        assert_eq!(fs::read_to_string(&file).unwrap(), "edited elsewhere");
    }

    #[test]
    fn test_create_rejects_bad_name_before_io() {
        let (root, fake, mut orchestrator) = setup();
        assert!(matches!(
            orchestrator.create_repository("bad/name", None),
            Err(GitNotesError::Validation(_))
        ));
        assert!(fake.calls().is_empty());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_create_saves_remote_link() {
        let (root, _fake, mut orchestrator) = setup();
        let path = create_linked(&mut orchestrator, &root, "notes");
        assert_eq!(
            fs::read_to_string(path.join(METADATA_FILE)).unwrap(),
            remote_url(&root)
        );
        assert_eq!(orchestrator.repositories()[0].remote_link, remote_url(&root));
    }

    #[test]
    fn test_create_failure_reports_error() {
        let (_root, fake, mut orchestrator) = setup();
        fake.fail_on(FakeStep::Init);
        let ticket = orchestrator.create_repository("notes", None).unwrap();
        let report = orchestrator.wait(ticket).unwrap();
        assert!(matches!(
            report.result,
            Err(GitNotesError::Git(GitError::Init(_, _)))
        ));
        assert_eq!(orchestrator.in_flight(), 0);
    }

    // --- Push ---

    #[test]
    fn test_push_runs_stages_in_order() {
        let (root, fake, mut orchestrator) = setup();
        let path = create_linked(&mut orchestrator, &root, "notes");
        orchestrator.store_mut().insert("Ideas", "launch plan").unwrap();
        let events = orchestrator.subscribe();

        let ticket = orchestrator.push("notes", false).unwrap();
        let report = orchestrator.wait(ticket).unwrap();

        assert_eq!(report.result.unwrap(), FlowOutcome::Pushed);
        assert_eq!(
            fake.calls(),
            vec![FakeStep::Init, FakeStep::Stage, FakeStep::Commit, FakeStep::Push]
        );
        assert!(path.join("Ideas.txt").is_file());

        let states: Vec<RepoState> = events
            .try_iter()
            .filter_map(|event| match event {
                SyncEvent::StateChanged { state, .. } => Some(state),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![
                RepoState::Staging,
                RepoState::Committing,
                RepoState::Transferring,
                RepoState::Idle
            ]
        );
    }

    #[test]
    fn test_stage_failure_never_commits_or_pushes() {
        let (root, fake, mut orchestrator) = setup();
        create_linked(&mut orchestrator, &root, "notes");
        fake.fail_on(FakeStep::Stage);

        let ticket = orchestrator.push("notes", false).unwrap();
        let report = orchestrator.wait(ticket).unwrap();

        assert!(matches!(
            report.result,
            Err(GitNotesError::Git(GitError::Stage(_)))
        ));
        assert_eq!(fake.calls(), vec![FakeStep::Init, FakeStep::Stage]);
        assert_eq!(orchestrator.state_of(&root.path().join("notes")), RepoState::Idle);
    }

    #[test]
    fn test_commit_failure_never_pushes() {
        let (root, fake, mut orchestrator) = setup();
        create_linked(&mut orchestrator, &root, "notes");
        fake.fail_on(FakeStep::Commit);

        let ticket = orchestrator.push("notes", false).unwrap();
        assert!(orchestrator.wait(ticket).unwrap().result.is_err());
        assert!(!fake.calls().contains(&FakeStep::Push));
    }

    #[test]
    fn test_second_flow_on_busy_repository_is_rejected() {
        let (root, fake, mut orchestrator) = setup();
        let path = create_linked(&mut orchestrator, &root, "notes");
        fake.set_delay(FakeStep::Stage, Duration::from_millis(100));

        let ticket = orchestrator.push("notes", false).unwrap();
        assert_ne!(orchestrator.state_of(&path), RepoState::Idle);
        assert!(matches!(
            orchestrator.push("notes", false),
            Err(GitNotesError::RepoBusy(_))
        ));
        assert!(matches!(
            orchestrator.pull("notes", None),
            Err(GitNotesError::RepoBusy(_))
        ));

        orchestrator.wait(ticket).unwrap().result.unwrap();
        let again = orchestrator.push("notes", false).unwrap();
        orchestrator.wait(again).unwrap().result.unwrap();
    }

    #[test]
    fn test_flows_on_different_repositories_run_together() {
        let (root, fake, mut orchestrator) = setup();
        create_linked(&mut orchestrator, &root, "first");
        create_linked(&mut orchestrator, &root, "second");
        fake.set_delay(FakeStep::Stage, Duration::from_millis(50));

        let a = orchestrator.push("first", false).unwrap();
        let b = orchestrator.pull("second", None).unwrap();
        assert_eq!(orchestrator.in_flight(), 2);

        orchestrator.wait(b).unwrap().result.unwrap();
        orchestrator.wait(a).unwrap().result.unwrap();
        assert_eq!(orchestrator.in_flight(), 0);
    }

    #[test]
    fn test_push_without_link_is_rejected() {
        let (_root, fake, mut orchestrator) = setup();
        let ticket = orchestrator.create_repository("notes", None).unwrap();
        orchestrator.wait(ticket).unwrap().result.unwrap();

        assert!(matches!(
            orchestrator.push("notes", false),
            Err(GitNotesError::Validation(_))
        ));
        assert_eq!(fake.calls(), vec![FakeStep::Init]);
    }

    #[test]
    fn test_network_push_needs_token() {
        let (_root, fake, mut orchestrator) = setup();
        let ticket = orchestrator
            .create_repository("notes", Some("https://github.com/user/notes.git"))
            .unwrap();
        orchestrator.wait(ticket).unwrap().result.unwrap();

        assert!(matches!(
            orchestrator.push("notes", false),
            Err(GitNotesError::Validation(_))
        ));

        orchestrator.login(Some("octocat"), &token()).unwrap();
        let ticket = orchestrator.push("notes", true).unwrap();
        orchestrator.wait(ticket).unwrap().result.unwrap();

        let seen = fake.credentials_seen();
        assert_eq!(seen.last().unwrap().token.as_deref(), Some(token().as_str()));
        let (remote, options) = fake.pushes().pop().unwrap();
        assert_eq!(remote, "https://github.com/user/notes.git");
        assert!(options.force);
    }

    #[test]
    fn test_unknown_repository() {
        let (_root, _fake, mut orchestrator) = setup();
        assert!(matches!(
            orchestrator.push("ghost", false),
            Err(GitNotesError::UnknownRepository(_))
        ));
    }

    // --- Pull / Clone ---

    #[test]
    fn test_pull_reconciles_and_saves_link() {
        let (root, fake, mut orchestrator) = setup();
        let ticket = orchestrator.create_repository("notes", None).unwrap();
        orchestrator.wait(ticket).unwrap().result.unwrap();
        let id = orchestrator.store_mut().insert("Shopping", "milk").unwrap();
        fake.set_remote_files(&[("Shopping.txt", "eggs"), ("Ideas.txt", "launch plan")]);
        let url = remote_url(&root);

        let ticket = orchestrator.pull("notes", Some(&url)).unwrap();
        let report = orchestrator.wait(ticket).unwrap();

        let FlowOutcome::Pulled(reconciled) = report.result.unwrap() else {
            panic!("expected pull outcome");
        };
        assert_eq!(reconciled.updated_bodies, vec![id]);
        assert_eq!(reconciled.inserted.len(), 1);
        assert_eq!(orchestrator.store().get(id).unwrap().body, "eggs\n");
        assert_eq!(orchestrator.repositories()[0].remote_link, url);
    }

    #[test]
    fn test_pull_failure_leaves_store_untouched() {
        let (root, fake, mut orchestrator) = setup();
        create_linked(&mut orchestrator, &root, "notes");
        orchestrator.store_mut().insert("Shopping", "milk").unwrap();
        fake.set_remote_files(&[("Shopping.txt", "eggs")]);
        fake.fail_on(FakeStep::Pull);

        let ticket = orchestrator.pull("notes", None).unwrap();
        let report = orchestrator.wait(ticket).unwrap();
        assert!(matches!(
            report.result,
            Err(GitNotesError::Git(GitError::Fetch(_)))
        ));
        assert_eq!(orchestrator.store().notes().next().unwrap().body, "milk");
    }

    #[test]
    fn test_clone_creates_tree_and_inserts_notes() {
        let (root, fake, mut orchestrator) = setup();
        fake.set_remote_files(&[("Ideas.txt", "launch plan")]);
        let url = remote_url(&root);
        let events = orchestrator.subscribe();

        let ticket = orchestrator.clone_repository(&url).unwrap();
        let report = orchestrator.wait(ticket).unwrap();

        assert_eq!(report.repository, root.path().join("shared"));
        let FlowOutcome::Cloned(reconciled) = report.result.unwrap() else {
            panic!("expected clone outcome");
        };
        assert_eq!(reconciled.inserted.len(), 1);
        let repos = orchestrator.repositories();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].remote_link, url);
        assert!(events
            .try_iter()
            .any(|event| event == SyncEvent::RepositoriesChanged));
    }

    #[test]
    fn test_clone_validation() {
        let (root, fake, mut orchestrator) = setup();
        assert!(orchestrator.clone_repository("not a url").is_err());
        assert!(orchestrator
            .clone_repository("https://github.com/user/bad.name.git")
            .is_err());
        // Network clone without a token
        assert!(orchestrator
            .clone_repository("https://github.com/user/notes.git")
            .is_err());

        fs::create_dir(root.path().join("shared")).unwrap();
        assert!(orchestrator.clone_repository(&remote_url(&root)).is_err());
        assert!(fake.calls().is_empty());
    }

    // --- Credentials / Misc ---

    #[test]
    fn test_login_validates_before_storing() {
        let (_root, _fake, orchestrator) = setup();
        assert!(orchestrator.login(Some("octocat"), "not-a-token").is_err());
        assert!(orchestrator.login(Some("-bad-"), &token()).is_err());
        assert_eq!(orchestrator.credential_store().load().unwrap(), Credentials::default());

        orchestrator.login(None, &token()).unwrap();
        assert_eq!(
            orchestrator.credential_store().token().unwrap(),
            Some(token())
        );
    }

    #[test]
    fn test_poll_is_non_blocking_and_collects_reports() {
        let (_root, _fake, mut orchestrator) = setup();
        assert!(orchestrator.poll().is_empty());

        let ticket = orchestrator.create_repository("notes", None).unwrap();
        let mut reports = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while reports.is_empty() && Instant::now() < deadline {
            reports = orchestrator.poll();
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].ticket, ticket);
    }

    #[test]
    fn test_wait_timeout_returns_none_while_running() {
        let (_root, fake, mut orchestrator) = setup();
        fake.set_delay(FakeStep::Init, Duration::from_millis(300));
        let ticket = orchestrator.create_repository("notes", None).unwrap();

        assert!(orchestrator
            .wait_timeout(ticket, Duration::from_millis(10))
            .unwrap()
            .is_none());
        assert!(orchestrator
            .wait_timeout(ticket, Duration::from_secs(5))
            .unwrap()
            .is_some());
        assert!(orchestrator.wait(ticket).is_err());
    }

    #[test]
    fn test_remove_repository() {
        let (root, _fake, mut orchestrator) = setup();
        let path = create_linked(&mut orchestrator, &root, "notes");
        assert!(orchestrator.remove_repository("notes").unwrap());
        assert!(!path.exists());
        assert!(orchestrator.repositories().is_empty());
    }
}
