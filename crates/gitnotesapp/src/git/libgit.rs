//! [`GitCapability`] on top of `git2`.
//!
//! Every call opens its own `Repository` handle: handles are not `Send`, and
//! the pipeline may run consecutive operations on different workers.

use super::error::{is_non_fast_forward, GitError};
use super::{GitCapability, InitStatus, TransferOptions};
use crate::credentials::Credentials;
use crate::registry::METADATA_FILE;
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    Commit, Cred, ErrorCode, FetchOptions, IndexAddOption, Oid, PushOptions, RemoteCallbacks,
    Repository, Signature,
};
use std::cell::{Cell, RefCell};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const ORIGIN: &str = "origin";
const FETCH_REFSPEC: &str = "+refs/heads/*:refs/remotes/origin/*";
const FALLBACK_BRANCHES: [&str; 2] = ["main", "master"];

/// Serializes writes to libgit2's process-wide server timeouts.
static SERVER_TIMEOUTS: Mutex<()> = Mutex::new(());

pub struct Git2Capability {
    author_name: String,
    author_email: String,
}

impl Git2Capability {
    /// `author_*` sign commits when the repository's git config has no identity.
    pub fn new(author_name: impl Into<String>, author_email: impl Into<String>) -> Self {
        Self {
            author_name: author_name.into(),
            author_email: author_email.into(),
        }
    }

    /// Bound how long a transport waits to connect to, or hear from, a
    /// server. `None` waits forever. The setting is process-wide in libgit2.
    pub fn with_transfer_timeout(self, timeout: Option<Duration>) -> Self {
        let millis = timeout.map_or(0, |t| i32::try_from(t.as_millis()).unwrap_or(i32::MAX));
        let _guard = SERVER_TIMEOUTS.lock().unwrap_or_else(|e| e.into_inner());
        // SAFETY: libgit2 only reads these values when a transport opens a
        // socket; writers are serialized by SERVER_TIMEOUTS.
        let applied = unsafe {
            git2::opts::set_server_connect_timeout_in_milliseconds(millis)
                .and_then(|()| git2::opts::set_server_timeout_in_milliseconds(millis))
        };
        match applied {
            Ok(()) => tracing::debug!(timeout_ms = millis, "git server timeouts set"),
            Err(e) => tracing::warn!(error = %e, "cannot set git server timeouts"),
        }
        self
    }

    fn open(path: &Path) -> Result<Repository, GitError> {
        Repository::open(path).map_err(|e| GitError::OpenRepo(path.to_path_buf(), e))
    }

    fn signature(&self, repo: &Repository) -> Result<Signature<'static>, git2::Error> {
        repo.signature()
            .or_else(|_| Signature::now(&self.author_name, &self.author_email))
    }
}

/// Tracks a transfer deadline from inside libgit2 callbacks.
struct Deadline {
    started: Instant,
    limit: Option<Duration>,
    expired: Cell<bool>,
}

impl Deadline {
    fn new(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
            expired: Cell::new(false),
        }
    }

    /// `false` once the deadline has passed, which makes libgit2 abort.
    fn check(&self) -> bool {
        match self.limit {
            Some(limit) if self.started.elapsed() >= limit => {
                self.expired.set(true);
                false
            }
            _ => true,
        }
    }

    /// A socket timeout surfaces as a plain transport error, never through
    /// a callback, so the elapsed time and the message are checked too.
    fn fail(&self, error: git2::Error, wrap: impl FnOnce(git2::Error) -> GitError) -> GitError {
        match self.limit {
            Some(limit)
                if self.expired.get()
                    || self.started.elapsed() >= limit
                    || is_timeout(&error) =>
            {
                GitError::TimedOut(limit)
            }
            _ => wrap(error),
        }
    }
}

fn is_timeout(error: &git2::Error) -> bool {
    let message = error.message().to_ascii_lowercase();
    message.contains("timed out") || message.contains("timeout")
}

fn remote_callbacks<'a>(credentials: &'a Credentials, deadline: &'a Deadline) -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    let mut attempts = 0u32;
    callbacks.credentials(move |_url, username_from_url, allowed| {
        attempts += 1;
        // libgit2 keeps asking while the server refuses; one try is enough
        if attempts > 1 {
            return Err(git2::Error::from_str("authentication failed"));
        }
        if !deadline.check() {
            return Err(git2::Error::from_str("transfer deadline exceeded"));
        }
        match credentials.token.as_deref() {
            Some(token) if allowed.is_user_pass_plaintext() => {
                Cred::userpass_plaintext(credentials.auth_username(), token)
            }
            _ if allowed.is_ssh_key() => Cred::ssh_key_from_agent(username_from_url.unwrap_or("git")),
            _ => Cred::default(),
        }
    });
    callbacks.transfer_progress(move |_| deadline.check());
    callbacks.sideband_progress(move |_| deadline.check());
    callbacks.push_negotiation(move |_| {
        if deadline.check() {
            Ok(())
        } else {
            Err(git2::Error::from_str("transfer deadline exceeded"))
        }
    });
    // Upload progress cannot abort; it only marks the deadline as passed.
    callbacks.push_transfer_progress(move |current, total, bytes| {
        tracing::trace!(current, total, bytes, "push progress");
        deadline.check();
    });
    callbacks
}

/// Keep the sidecar out of commits.
fn exclude_sidecar(repo: &Repository) -> std::io::Result<()> {
    let pattern = format!("/{}", METADATA_FILE);
    let info = repo.path().join("info");
    fs::create_dir_all(&info)?;
    let exclude = info.join("exclude");
    let existing = fs::read_to_string(&exclude).unwrap_or_default();
    if existing.lines().any(|line| line.trim() == pattern) {
        return Ok(());
    }
    let mut file = OpenOptions::new().create(true).append(true).open(exclude)?;
    if !existing.is_empty() && !existing.ends_with('\n') {
        writeln!(file)?;
    }
    writeln!(file, "{}", pattern)
}

/// Short name of the branch HEAD points at, born or not.
fn current_branch(repo: &Repository) -> Result<String, GitError> {
    let head = repo.find_reference("HEAD")?;
    match head.symbolic_target() {
        Some(target) => Ok(target.trim_start_matches("refs/heads/").to_string()),
        None => Err(GitError::Git(git2::Error::from_str("HEAD is detached"))),
    }
}

fn head_is_unborn(repo: &Repository) -> bool {
    matches!(repo.head(), Err(ref e) if e.code() == ErrorCode::UnbornBranch)
}

/// Remote-tracking tip to integrate. An unborn local branch adopts whichever
/// of the usual default branches the remote has.
fn remote_tip(repo: &Repository, branch: &str) -> Result<Option<(String, Oid)>, GitError> {
    let mut candidates = vec![branch];
    if head_is_unborn(repo) {
        candidates.extend(FALLBACK_BRANCHES.iter().copied().filter(|b| *b != branch));
    }
    for candidate in candidates {
        match repo.refname_to_id(&format!("refs/remotes/{}/{}", ORIGIN, candidate)) {
            Ok(oid) => return Ok(Some((candidate.to_string(), oid))),
            Err(e) if e.code() == ErrorCode::NotFound => continue,
            Err(e) => return Err(GitError::Fetch(e)),
        }
    }
    Ok(None)
}

/// Point `origin` at `url`, creating it when missing.
fn ensure_origin(repo: &Repository, url: &str) -> Result<(), git2::Error> {
    match repo.find_remote(ORIGIN) {
        Ok(remote) if remote.url() == Some(url) => Ok(()),
        Ok(_) => repo.remote_set_url(ORIGIN, url),
        Err(e) if e.code() == ErrorCode::NotFound => repo.remote(ORIGIN, url).map(|_| ()),
        Err(e) => Err(e),
    }
}

/// Write `oid`'s tree into the working tree, then move `branch` and HEAD to it.
/// Note files are derived from the store, so local edits are overwritten.
fn fast_forward(repo: &Repository, branch: &str, oid: Oid) -> Result<(), GitError> {
    let local_ref = format!("refs/heads/{}", branch);
    let commit = repo
        .find_commit(oid)
        .map_err(|e| GitError::Checkout(branch.to_string(), e))?;
    let mut checkout = CheckoutBuilder::new();
    checkout.force();
    repo.checkout_tree(commit.as_object(), Some(&mut checkout))
        .map_err(|e| GitError::Checkout(branch.to_string(), e))?;

    match repo.find_reference(&local_ref) {
        Ok(mut reference) => {
            reference.set_target(oid, "pull: fast-forward")?;
        }
        Err(e) if e.code() == ErrorCode::NotFound => {
            repo.reference(&local_ref, oid, true, "pull: create branch")?;
        }
        Err(e) => return Err(GitError::Git(e)),
    }
    repo.set_head(&local_ref)
        .map_err(|e| GitError::Checkout(branch.to_string(), e))?;
    Ok(())
}

impl GitCapability for Git2Capability {
    fn init(&self, path: &Path) -> Result<InitStatus, GitError> {
        if path.join(".git").exists() {
            Self::open(path)?;
            return Ok(InitStatus::Exists);
        }
        let repo = Repository::init(path).map_err(|e| GitError::Init(path.to_path_buf(), e))?;
        exclude_sidecar(&repo)?;
        Ok(InitStatus::Created)
    }

    fn stage(&self, path: &Path, pattern: &str) -> Result<(), GitError> {
        let repo = Self::open(path)?;
        if let Err(e) = exclude_sidecar(&repo) {
            tracing::warn!(repo = %path.display(), error = %e, "cannot exclude metadata sidecar");
        }
        let pathspec = if pattern == "." { "*" } else { pattern };
        let mut index = repo.index().map_err(GitError::Stage)?;
        index
            .add_all([pathspec], IndexAddOption::DEFAULT, None)
            .map_err(GitError::Stage)?;
        index
            .update_all([pathspec], None)
            .map_err(GitError::Stage)?;
        index.write().map_err(GitError::Stage)?;
        Ok(())
    }

    fn commit(&self, path: &Path, message: &str) -> Result<(), GitError> {
        let repo = Self::open(path)?;
        let signature = self.signature(&repo).map_err(GitError::Commit)?;
        let mut index = repo.index().map_err(GitError::Commit)?;
        let tree_id = index.write_tree().map_err(GitError::Commit)?;
        let tree = repo.find_tree(tree_id).map_err(GitError::Commit)?;

        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit().map_err(GitError::Commit)?),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => None,
            Err(e) => return Err(GitError::Commit(e)),
        };
        let parents: Vec<&Commit> = parent.iter().collect();

        let oid = repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .map_err(GitError::Commit)?;
        tracing::debug!(repo = %path.display(), %oid, "commit created");
        Ok(())
    }

    fn push(
        &self,
        path: &Path,
        remote: &str,
        credentials: &Credentials,
        options: TransferOptions,
    ) -> Result<(), GitError> {
        let repo = Self::open(path)?;
        let head = repo.head().map_err(GitError::Push)?;
        let branch = head
            .name()
            .ok_or_else(|| GitError::Push(git2::Error::from_str("HEAD is not valid UTF-8")))?
            .to_string();
        let refspec = if options.force {
            format!("+{0}:{0}", branch)
        } else {
            format!("{0}:{0}", branch)
        };

        let mut target = repo.remote_anonymous(remote).map_err(GitError::Push)?;
        let deadline = Deadline::new(options.deadline);
        let rejection: RefCell<Option<String>> = RefCell::new(None);

        {
            let mut callbacks = remote_callbacks(credentials, &deadline);
            callbacks.push_update_reference(|_ref_name, status| {
                if let Some(message) = status {
                    *rejection.borrow_mut() = Some(message.to_string());
                }
                Ok(())
            });
            let mut push_options = PushOptions::new();
            push_options.remote_callbacks(callbacks);

            if let Err(e) = target.push(&[refspec.as_str()], Some(&mut push_options)) {
                let message = e.message().to_string();
                if e.code() == ErrorCode::NotFastForward || is_non_fast_forward(&message) {
                    return Err(GitError::PushRejected {
                        message,
                        needs_force: true,
                    });
                }
                return Err(deadline.fail(e, GitError::Push));
            }
        }

        if let Some(message) = rejection.into_inner() {
            let needs_force = is_non_fast_forward(&message);
            return Err(GitError::PushRejected {
                message,
                needs_force,
            });
        }
        tracing::debug!(repo = %path.display(), %branch, force = options.force, "push accepted");
        Ok(())
    }

    fn pull(
        &self,
        path: &Path,
        remote: &str,
        credentials: &Credentials,
        options: TransferOptions,
    ) -> Result<(), GitError> {
        let repo = Self::open(path)?;
        ensure_origin(&repo, remote).map_err(GitError::Fetch)?;

        let deadline = Deadline::new(options.deadline);
        {
            let mut origin = repo.find_remote(ORIGIN).map_err(GitError::Fetch)?;
            let mut fetch_options = FetchOptions::new();
            fetch_options.remote_callbacks(remote_callbacks(credentials, &deadline));
            origin
                .fetch(&[FETCH_REFSPEC], Some(&mut fetch_options), None)
                .map_err(|e| deadline.fail(e, GitError::Fetch))?;
        }

        let branch = current_branch(&repo)?;
        let Some((remote_branch, remote_oid)) = remote_tip(&repo, &branch)? else {
            tracing::debug!(repo = %path.display(), "remote has no matching branch, nothing to pull");
            return Ok(());
        };

        match repo.refname_to_id(&format!("refs/heads/{}", remote_branch)) {
            Ok(local_oid) if local_oid == remote_oid => {
                tracing::debug!(repo = %path.display(), "already up to date");
                Ok(())
            }
            Ok(local_oid) => {
                if repo.graph_descendant_of(local_oid, remote_oid)? {
                    tracing::debug!(repo = %path.display(), "local branch is ahead of remote");
                    return Ok(());
                }
                if !repo.graph_descendant_of(remote_oid, local_oid)? {
                    return Err(GitError::NotFastForward(remote_branch));
                }
                fast_forward(&repo, &remote_branch, remote_oid)
            }
            Err(e) if e.code() == ErrorCode::NotFound => {
                fast_forward(&repo, &remote_branch, remote_oid)
            }
            Err(e) => Err(GitError::Git(e)),
        }
    }

    fn clone_repo(
        &self,
        remote: &str,
        credentials: &Credentials,
        destination: &Path,
        options: TransferOptions,
    ) -> Result<(), GitError> {
        let deadline = Deadline::new(options.deadline);
        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(remote_callbacks(credentials, &deadline));

        let repo = RepoBuilder::new()
            .fetch_options(fetch_options)
            .clone(remote, destination)
            .map_err(|e| {
                deadline.fail(e, |source| GitError::Clone {
                    url: remote.to_string(),
                    source,
                })
            })?;
        if let Err(e) = exclude_sidecar(&repo) {
            tracing::warn!(repo = %destination.display(), error = %e, "cannot exclude metadata sidecar");
        }
        Ok(())
    }
}
