use crate::commands::{CmdMessage, CmdResult};
use crate::credentials::CredentialStore;
use crate::error::{GitNotesError, Result};
use crate::model::repo_dir_name;
use crate::reconcile::ReconcileReport;
use crate::store::backend::NoteBackend;
use crate::sync::{FlowOutcome, FlowTicket, SyncOrchestrator};

fn outcome<B: NoteBackend, C: CredentialStore>(
    sync: &mut SyncOrchestrator<B, C>,
    ticket: FlowTicket,
) -> Result<(String, FlowOutcome)> {
    let report = sync.wait(ticket)?;
    let name = repo_dir_name(&report.repository);
    Ok((name, report.result?))
}

/// Notes a pull or clone touched, in report order.
fn reconciled_result<B: NoteBackend, C: CredentialStore>(
    sync: &SyncOrchestrator<B, C>,
    verb: &str,
    name: &str,
    report: ReconcileReport,
) -> CmdResult {
    let mut result = CmdResult::default();
    let touched = report
        .inserted
        .iter()
        .chain(&report.updated_bodies)
        .chain(&report.updated_titles);
    result.affected_notes = touched
        .filter_map(|&id| sync.store().get(id).cloned())
        .collect();

    if report.changed() == 0 {
        result.add_message(CmdMessage::success(format!(
            "{} {}: notes already up to date",
            verb, name
        )));
    } else {
        result.add_message(CmdMessage::success(format!(
            "{} {}: {} added, {} updated",
            verb,
            name,
            report.inserted.len(),
            report.updated_bodies.len() + report.updated_titles.len()
        )));
    }
    result.reconciled = Some(report);
    result
}

pub fn push<B: NoteBackend, C: CredentialStore>(
    sync: &mut SyncOrchestrator<B, C>,
    repository: &str,
    force: bool,
) -> Result<CmdResult> {
    let ticket = sync.push(repository, force)?;
    let (name, outcome) = outcome(sync, ticket)?;
    match outcome {
        FlowOutcome::Pushed => {
            let mut result = CmdResult::default();
            let verb = if force { "Force-pushed" } else { "Pushed" };
            result.add_message(CmdMessage::success(format!(
                "{} {} notes to {}",
                verb,
                sync.store().notes().count(),
                name
            )));
            Ok(result)
        }
        other => Err(GitNotesError::Api(format!("unexpected outcome for push: {:?}", other))),
    }
}

pub fn pull<B: NoteBackend, C: CredentialStore>(
    sync: &mut SyncOrchestrator<B, C>,
    repository: &str,
    remote: Option<&str>,
) -> Result<CmdResult> {
    let ticket = sync.pull(repository, remote)?;
    match outcome(sync, ticket)? {
        (name, FlowOutcome::Pulled(report)) => Ok(reconciled_result(sync, "Pulled", &name, report)),
        (_, other) => Err(GitNotesError::Api(format!("unexpected outcome for pull: {:?}", other))),
    }
}

pub fn clone<B: NoteBackend, C: CredentialStore>(
    sync: &mut SyncOrchestrator<B, C>,
    url: &str,
) -> Result<CmdResult> {
    let ticket = sync.clone_repository(url)?;
    match outcome(sync, ticket)? {
        (name, FlowOutcome::Cloned(report)) => Ok(reconciled_result(sync, "Cloned", &name, report)),
        (_, other) => Err(GitNotesError::Api(format!("unexpected outcome for clone: {:?}", other))),
    }
}
