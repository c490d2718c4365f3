//! Flows against real git repositories, with a bare repository on disk as
//! the shared remote.

use git2::Repository;
use gitnotesapp::config::GitNotesConfig;
use gitnotesapp::credentials::MemCredentialStore;
use gitnotesapp::error::GitNotesError;
use gitnotesapp::git::{Git2Capability, GitCapability, GitError, GitPipeline, InitStatus};
use gitnotesapp::registry::{RepositoryRegistry, METADATA_FILE};
use gitnotesapp::store::mem_backend::MemBackend;
use gitnotesapp::store::NoteStore;
use gitnotesapp::sync::{FlowOutcome, FlowTicket, SyncOrchestrator};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

type Orchestrator = SyncOrchestrator<MemBackend, MemCredentialStore>;

fn git() -> Git2Capability {
    Git2Capability::new("Test", "test@example.com")
}

fn bare_remote(dir: &Path) -> String {
    let path = dir.join("shared.git");
    Repository::init_bare(&path).unwrap();
    format!("file://{}", path.display())
}

fn orchestrator(root: PathBuf) -> Orchestrator {
    let config = GitNotesConfig::default();
    SyncOrchestrator::new(
        NoteStore::open(MemBackend::new()).unwrap(),
        RepositoryRegistry::open(root, config.missing_link.clone()),
        GitPipeline::new(Arc::new(git()), config.worker_threads()),
        MemCredentialStore::new(),
        config,
    )
}

fn finish(sync: &mut Orchestrator, ticket: FlowTicket) -> Result<FlowOutcome, GitNotesError> {
    sync.wait(ticket).unwrap().result
}

fn body_of(sync: &Orchestrator, title: &str) -> String {
    sync.store()
        .notes()
        .find(|note| note.title == title)
        .map(|note| note.body.clone())
        .unwrap()
}

#[test]
fn test_notes_travel_between_two_stores() {
    let temp = TempDir::new().unwrap();
    let url = bare_remote(temp.path());
    let mut alice = orchestrator(temp.path().join("alice"));
    let mut bob = orchestrator(temp.path().join("bob"));

    // Alice creates a linked repository and pushes two notes
    alice.store_mut().insert("Shopping", "milk").unwrap();
    alice.store_mut().insert("Ideas", "launch plan").unwrap();
    let ticket = alice.create_repository("notes", Some(&url)).unwrap();
    assert_eq!(
        finish(&mut alice, ticket).unwrap(),
        FlowOutcome::Initialized(InitStatus::Created)
    );
    let ticket = alice.push("notes", false).unwrap();
    assert_eq!(finish(&mut alice, ticket).unwrap(), FlowOutcome::Pushed);

    // Bob clones and gets both notes
    let ticket = bob.clone_repository(&url).unwrap();
    let FlowOutcome::Cloned(report) = finish(&mut bob, ticket).unwrap() else {
        panic!("expected clone outcome");
    };
    assert_eq!(report.inserted.len(), 2);
    assert_eq!(body_of(&bob, "Shopping"), "milk\n");
    let cloned = &bob.repositories()[0];
    assert_eq!(cloned.name(), "shared");
    assert_eq!(cloned.remote_link, url);

    // Alice edits and pushes, Bob pulls the edit
    let id = alice.store().notes().next().unwrap().id;
    alice.store_mut().update(id, "Shopping", "eggs").unwrap();
    let ticket = alice.push("notes", false).unwrap();
    finish(&mut alice, ticket).unwrap();

    let ticket = bob.pull("shared", None).unwrap();
    let FlowOutcome::Pulled(report) = finish(&mut bob, ticket).unwrap() else {
        panic!("expected pull outcome");
    };
    assert_eq!(report.updated_bodies.len(), 1);
    assert_eq!(report.unchanged, 1);
    assert_eq!(body_of(&bob, "Shopping"), "eggs\n");
}

#[test]
fn test_diverged_push_needs_force() {
    let temp = TempDir::new().unwrap();
    let url = bare_remote(temp.path());
    let mut alice = orchestrator(temp.path().join("alice"));
    let mut bob = orchestrator(temp.path().join("bob"));

    alice.store_mut().insert("Shopping", "milk").unwrap();
    let ticket = alice.create_repository("notes", Some(&url)).unwrap();
    finish(&mut alice, ticket).unwrap();
    let ticket = alice.push("notes", false).unwrap();
    finish(&mut alice, ticket).unwrap();

    let ticket = bob.clone_repository(&url).unwrap();
    finish(&mut bob, ticket).unwrap();
    bob.store_mut().insert("Bob", "from bob").unwrap();
    let ticket = bob.push("shared", false).unwrap();
    finish(&mut bob, ticket).unwrap();

    // Alice's history no longer contains the remote tip
    alice.store_mut().insert("Alice", "from alice").unwrap();
    let ticket = alice.push("notes", false).unwrap();
    match finish(&mut alice, ticket) {
        Err(GitNotesError::Git(e)) => assert!(e.needs_force(), "unexpected error: {}", e),
        other => panic!("expected rejection, got {:?}", other),
    }

    // Pulling cannot fast-forward either
    let ticket = alice.pull("notes", None).unwrap();
    assert!(matches!(
        finish(&mut alice, ticket),
        Err(GitNotesError::Git(GitError::NotFastForward(_)))
    ));

    let ticket = alice.push("notes", true).unwrap();
    assert_eq!(finish(&mut alice, ticket).unwrap(), FlowOutcome::Pushed);
}

#[test]
fn test_pull_into_fresh_repository_adopts_remote_branch() {
    let temp = TempDir::new().unwrap();
    let url = bare_remote(temp.path());
    let mut alice = orchestrator(temp.path().join("alice"));
    let mut bob = orchestrator(temp.path().join("bob"));

    alice.store_mut().insert("Ideas", "launch plan").unwrap();
    let ticket = alice.create_repository("notes", Some(&url)).unwrap();
    finish(&mut alice, ticket).unwrap();
    let ticket = alice.push("notes", false).unwrap();
    finish(&mut alice, ticket).unwrap();

    // Bob starts with an unlinked, empty repository
    let ticket = bob.create_repository("mine", None).unwrap();
    finish(&mut bob, ticket).unwrap();
    let ticket = bob.pull("mine", Some(&url)).unwrap();
    let FlowOutcome::Pulled(report) = finish(&mut bob, ticket).unwrap() else {
        panic!("expected pull outcome");
    };
    assert_eq!(report.inserted.len(), 1);

    // The pulled remote becomes the link
    let path = temp.path().join("bob").join("mine");
    assert_eq!(fs::read_to_string(path.join(METADATA_FILE)).unwrap(), url);
    assert_eq!(bob.repositories()[0].remote_link, url);
}

#[test]
fn test_pull_from_empty_remote_is_a_no_op() {
    let temp = TempDir::new().unwrap();
    let url = bare_remote(temp.path());
    let path = temp.path().join("work");
    fs::create_dir(&path).unwrap();

    let capability = git();
    capability.init(&path).unwrap();
    capability
        .pull(&path, &url, &Default::default(), Default::default())
        .unwrap();
}

#[test]
fn test_clone_of_missing_remote_fails() {
    let temp = TempDir::new().unwrap();
    let mut bob = orchestrator(temp.path().join("bob"));
    let url = format!("file://{}/nowhere.git", temp.path().display());

    let ticket = bob.clone_repository(&url).unwrap();
    assert!(matches!(
        finish(&mut bob, ticket),
        Err(GitNotesError::Git(GitError::Clone { .. }))
    ));
    assert!(bob.repositories().is_empty());
}
