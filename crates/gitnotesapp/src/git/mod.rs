//! # Git Layer
//!
//! Everything that talks to git goes through the [`GitCapability`] trait:
//!
//! - [`libgit::Git2Capability`]: the real implementation on top of `git2`.
//! - [`pipeline::GitPipeline`]: runs capability calls on a fixed worker pool
//!   and reports each one through exactly one completion callback.
//!
//! The capability is synchronous and stateless between calls. Repository
//! handles are opened per call, so an implementation only has to be
//! `Send + Sync` to be shared by every worker.
//!
//! Credentials are passed into every network call and never kept.

use crate::credentials::Credentials;
use std::path::Path;
use std::time::Duration;

pub mod error;
pub mod libgit;
pub mod pipeline;

pub use error::GitError;
pub use libgit::Git2Capability;
pub use pipeline::GitPipeline;

/// Outcome of a successful `init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStatus {
    /// A fresh repository was initialized.
    Created,
    /// A repository was already there and was reused untouched.
    Exists,
}

impl InitStatus {
    /// Numeric tri-state: `0` created, `1` exists, `-1` error.
    pub fn code(result: &Result<InitStatus, GitError>) -> i32 {
        match result {
            Ok(InitStatus::Created) => 0,
            Ok(InitStatus::Exists) => 1,
            Err(_) => -1,
        }
    }
}

/// Per-call knobs for network operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferOptions {
    /// Overwrite the remote branch even if that loses history.
    pub force: bool,
    /// Abort the transfer once this much time has passed.
    pub deadline: Option<Duration>,
}

pub trait GitCapability: Send + Sync {
    /// Initialize `path` as a working tree, or reuse an existing one.
    fn init(&self, path: &Path) -> Result<InitStatus, GitError>;

    /// Stage files matching `pattern`, including deletions. `"."` means everything.
    fn stage(&self, path: &Path, pattern: &str) -> Result<(), GitError>;

    fn commit(&self, path: &Path, message: &str) -> Result<(), GitError>;

    /// Push the current branch to `remote`.
    fn push(
        &self,
        path: &Path,
        remote: &str,
        credentials: &Credentials,
        options: TransferOptions,
    ) -> Result<(), GitError>;

    /// Fetch `remote` as `origin` and fast-forward the current branch.
    fn pull(
        &self,
        path: &Path,
        remote: &str,
        credentials: &Credentials,
        options: TransferOptions,
    ) -> Result<(), GitError>;

    fn clone_repo(
        &self,
        remote: &str,
        credentials: &Credentials,
        destination: &Path,
        options: TransferOptions,
    ) -> Result<(), GitError>;
}
