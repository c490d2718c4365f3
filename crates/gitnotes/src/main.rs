//! # gitnotes CLI
//!
//! The binary is thin: the CLI lives in `src/cli/` and this file only invokes
//! `cli::run()` and handles process termination.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  CLI (crates/gitnotes/src/cli/)              │
//! │  - clap argument parsing (setup.rs)          │
//! │  - dispatch + logging setup (commands.rs)    │
//! │  - terminal and JSON output (render.rs)      │
//! └──────────────────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────┐
//! │  API (crates/gitnotesapp/src/api.rs)         │
//! │  - parses note ids, dispatches to commands   │
//! └──────────────────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────┐
//! │  Commands, sync flows, git, store            │
//! │  - no stdout/stderr, no process exits        │
//! └──────────────────────────────────────────────┘
//! ```

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {}", e);
        if let Some(hint) = cli::hint_for(&e) {
            eprintln!("{}", hint);
        }
        std::process::exit(1);
    }
}
