use crate::commands::{CmdMessage, CmdResult};
use crate::credentials::CredentialStore;
use crate::error::Result;
use crate::store::backend::NoteBackend;
use crate::sync::SyncOrchestrator;

pub fn run<B: NoteBackend, C: CredentialStore>(
    sync: &SyncOrchestrator<B, C>,
    username: Option<&str>,
    token: &str,
) -> Result<CmdResult> {
    sync.login(username, token)?;
    let mut result = CmdResult::default();
    let who = sync
        .credential_store()
        .username()?
        .unwrap_or_else(|| "token".to_string());
    result.add_message(CmdMessage::success(format!("Credentials saved for {}", who)));
    Ok(result)
}
