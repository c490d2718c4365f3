use crate::commands::{CmdMessage, CmdResult};
use crate::credentials::CredentialStore;
use crate::error::{GitNotesError, Result};
use crate::git::InitStatus;
use crate::store::backend::NoteBackend;
use crate::sync::{FlowOutcome, SyncOrchestrator};

pub fn create<B: NoteBackend, C: CredentialStore>(
    sync: &mut SyncOrchestrator<B, C>,
    name: &str,
    remote: Option<&str>,
) -> Result<CmdResult> {
    let ticket = sync.create_repository(name, remote)?;
    let report = sync.wait(ticket)?;
    let name = name.trim();

    let mut result = CmdResult::default();
    match report.result? {
        FlowOutcome::Initialized(InitStatus::Created) => result.add_message(CmdMessage::success(
            format!("Repository created: {}", name),
        )),
        FlowOutcome::Initialized(InitStatus::Exists) => result.add_message(CmdMessage::info(
            format!("Repository {} already exists, left untouched", name),
        )),
        other => {
            return Err(GitNotesError::Api(format!(
                "unexpected outcome for create: {:?}",
                other
            )))
        }
    }
    if let Some(repository) = sync.registry().get(&report.repository) {
        result.repositories.push(repository);
    }
    Ok(result)
}

pub fn list<B: NoteBackend, C: CredentialStore>(sync: &mut SyncOrchestrator<B, C>) -> Result<CmdResult> {
    sync.rescan();
    let repositories = sync.repositories();
    let mut result = CmdResult::default();
    if repositories.is_empty() {
        result.add_message(CmdMessage::info("No repositories yet"));
    }
    Ok(result.with_repositories(repositories))
}

pub fn remove<B: NoteBackend, C: CredentialStore>(
    sync: &mut SyncOrchestrator<B, C>,
    name: &str,
) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    if sync.remove_repository(name)? {
        result.add_message(CmdMessage::success(format!("Repository removed: {}", name)));
    } else {
        result.add_message(CmdMessage::warning(format!(
            "Repository {} was only partly removed",
            name
        )));
    }
    Ok(result)
}
