//! # gitnotesapp
//!
//! A local-first note store that synchronizes plain text notes with git
//! working trees.
//!
//! Notes live in a durable, ordered store. Each git working tree under the
//! repositories root holds one `.txt` file per note plus a `.metadata` file
//! recording its remote link. Pushing writes the notes out, then stages,
//! commits and pushes. Pulling and cloning fetch remote changes and reconcile
//! the files back into the store.
//!
//! ## Layers
//!
//! - [`api`]: facade every UI talks to
//! - [`commands`]: UI-agnostic operations returning [`commands::CmdResult`]
//! - [`sync`]: per-repository flow state machines
//! - [`git`]: git capability over `git2` and the worker pool running it
//! - [`reconcile`]: merging note files back into the store
//! - [`codec`]: note to file mapping
//! - [`registry`]: discovering working trees and their remote links
//! - [`store`]: the durable note arena
//! - [`credentials`]: username and access token

pub mod api;
pub mod codec;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod error;
pub mod git;
pub mod init;
pub mod model;
pub mod reconcile;
pub mod registry;
pub mod store;
pub mod sync;
pub mod validate;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
