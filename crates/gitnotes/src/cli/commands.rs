//! # CLI Layer
//!
//! The only place that reads stdin, writes stdout and sets up logging.
//!
//! 1. **Argument Parsing**: clap turns the shell arguments into [`Cli`]
//! 2. **Context Setup**: [`initialize`] wires the store, registry and git pool
//! 3. **Dispatch**: each command calls one API method
//! 4. **Output**: [`render`](super::render) prints the [`CmdResult`]

use super::render::{self, NoteView};
use super::setup::{Cli, Commands, NoteCommands, RepoCommands};
use anyhow::Context;
use clap::Parser;
use gitnotesapp::api::GitNotesApi;
use gitnotesapp::commands::CmdResult;
use gitnotesapp::credentials::FsCredentialStore;
use gitnotesapp::error::GitNotesError;
use gitnotesapp::init::initialize;
use gitnotesapp::store::fs_backend::FsBackend;
use std::io::{IsTerminal, Read};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

type Api = GitNotesApi<FsBackend, FsCredentialStore>;

pub const LOG_ENV: &str = "GITNOTES_LOG";

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let view = match &cli.command {
        Some(Commands::Note(NoteCommands::Show { .. })) => NoteView::Full,
        _ => NoteView::Lines,
    };
    let mut ctx = initialize(cli.data.clone())?;
    let result = dispatch(&mut ctx.api, cli.command)?;
    render::print_result(&result, cli.output, view)
}

fn init_logging(verbose: bool) {
    let default = if verbose { LevelFilter::DEBUG } else { LevelFilter::WARN };
    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();
    // A second init (only possible in tests) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

fn dispatch(api: &mut Api, command: Option<Commands>) -> anyhow::Result<CmdResult> {
    let result = match command {
        None => api.list_notes()?,
        Some(Commands::Note(command)) => note(api, command)?,
        Some(Commands::Repo(command)) => repo(api, command)?,
        Some(Commands::Push { repository, force }) => api.push(&repository, force)?,
        Some(Commands::Pull { repository, remote }) => api.pull(&repository, remote.as_deref())?,
        Some(Commands::Clone { url }) => api.clone_repository(&url)?,
        Some(Commands::Login { token, username }) => api.login(username.as_deref(), &token)?,
    };
    Ok(result)
}

fn note(api: &mut Api, command: NoteCommands) -> anyhow::Result<CmdResult> {
    let result = match command {
        NoteCommands::Add { title, body } => {
            let body = match body {
                Some(body) => body,
                None => read_piped_body()?,
            };
            api.add_note(&title.join(" "), &body)?
        }
        NoteCommands::List => api.list_notes()?,
        NoteCommands::Show { ids } => api.view_notes(&ids)?,
        NoteCommands::Edit { id, title, body } => {
            api.edit_note(&id, title.as_deref(), body.as_deref())?
        }
        NoteCommands::Rm { ids } => api.delete_notes(&ids)?,
    };
    Ok(result)
}

fn repo(api: &mut Api, command: RepoCommands) -> anyhow::Result<CmdResult> {
    let result = match command {
        RepoCommands::Create { name, remote } => api.create_repository(&name, remote.as_deref())?,
        RepoCommands::List => api.list_repositories()?,
        RepoCommands::Rm { name } => api.remove_repository(&name)?,
    };
    Ok(result)
}

fn read_piped_body() -> anyhow::Result<String> {
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Ok(String::new());
    }
    let mut body = String::new();
    stdin
        .read_to_string(&mut body)
        .context("failed to read note body from stdin")?;
    Ok(body)
}

/// Follow-up advice for errors the user can act on.
pub fn hint_for(error: &anyhow::Error) -> Option<&'static str> {
    match error.downcast_ref::<GitNotesError>()? {
        GitNotesError::Git(git) if git.needs_force() => {
            Some("The remote has changes you don't have. Pull first, or push with --force to overwrite them.")
        }
        GitNotesError::Git(git) if git.is_retryable() => Some("This may be temporary. Try again."),
        GitNotesError::RepoBusy(_) => Some("Wait for the running operation to finish."),
        _ => None,
    }
}
