//! # CLI Behavior
//!
//! One possible UI client for gitnotes. It is the only place that knows about
//! terminal I/O, exit codes and output formatting.
//!
//! ## Naked Execution
//!
//! Running `gitnotes` with no arguments lists the notes.
//!
//! ## Note Bodies
//!
//! `gitnotes note add <title>` takes the body from `--body`, or from stdin
//! when something is piped in. Otherwise the note starts empty.
//!
//! ## Sync
//!
//! `push`, `pull` and `clone` block until their flow finishes and print what
//! changed. A push the remote refuses because it would lose history suggests
//! pulling first or `--force`.
//!
//! ## Logging
//!
//! Diagnostics go to stderr through `tracing`. The level defaults to `warn`,
//! `-v` raises it to `debug`, and `GITNOTES_LOG` takes any `EnvFilter`
//! directive.
//!
//! ## Module Structure
//!
//! - `setup`: argument parsing via clap
//! - `commands`: dispatch to the API and logging setup
//! - `render`: text and JSON output

mod commands;
mod render;
pub mod setup;

pub use commands::{hint_for, run};
