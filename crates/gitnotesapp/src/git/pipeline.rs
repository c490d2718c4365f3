//! # Git Operation Pipeline
//!
//! Runs [`GitCapability`] calls off the calling thread on a fixed pool of
//! workers fed by one `crossbeam` channel.
//!
//! ## Completion Contract
//!
//! Every submitted operation reports through its `done` callback exactly
//! once, with `Ok` or with the causing [`GitError`]. That holds when the
//! operation panics (reported as [`GitError::Panicked`]) and when the pool has
//! already shut down. Callbacks run on a worker thread; callers that own
//! single-threaded state forward the result over a channel.
//!
//! ## Failure
//!
//! A failed operation leaves the working tree as the failing sub-step left
//! it. There is no rollback.
//!
//! ## Pool Size
//!
//! At least two workers, so one hung transfer never blocks every repository.

use super::{GitCapability, GitError, InitStatus, TransferOptions};
use crate::config::MIN_WORKER_THREADS;
use crate::credentials::Credentials;
use crossbeam::channel::{unbounded, Sender};
use std::any::Any;
use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// A queued operation. `None` means the pool is gone and the job must fail.
type Job = Box<dyn FnOnce(Option<&dyn GitCapability>) + Send>;

pub struct GitPipeline {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl GitPipeline {
    pub fn new(capability: Arc<dyn GitCapability>, threads: usize) -> Self {
        let threads = threads.max(MIN_WORKER_THREADS);
        let (sender, receiver) = unbounded::<Job>();

        let workers = (0..threads)
            .map(|index| {
                let receiver = receiver.clone();
                let capability = Arc::clone(&capability);
                thread::Builder::new()
                    .name(format!("gitnotes-git-{}", index))
                    .spawn(move || {
                        for job in receiver {
                            // A panicking callback must not take the worker down
                            if catch_unwind(AssertUnwindSafe(|| job(Some(capability.as_ref())))).is_err() {
                                tracing::error!("git completion callback panicked");
                            }
                        }
                    })
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::error!(error = %e, "failed to spawn git worker");
                    None
                }
            })
            .collect();

        Self {
            sender: Some(sender),
            workers,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    fn submit<T, W, F>(&self, op: &'static str, repo: PathBuf, work: W, done: F)
    where
        T: Send + 'static,
        W: FnOnce(&dyn GitCapability, &Path) -> Result<T, GitError> + Send + 'static,
        F: FnOnce(Result<T, GitError>) + Send + 'static,
    {
        let job: Job = Box::new(move |capability: Option<&dyn GitCapability>| {
            let span = tracing::info_span!("git_op", op, repo = %repo.display());
            let _guard = span.enter();
            let started = Instant::now();

            let result = match capability {
                Some(capability) => catch_unwind(AssertUnwindSafe(|| work(capability, &repo)))
                    .unwrap_or_else(|payload| Err(GitError::Panicked(panic_message(payload)))),
                None => Err(GitError::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "git worker pool has shut down",
                ))),
            };

            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => tracing::info!(elapsed_ms, "git operation finished"),
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "git operation failed"),
            }
            done(result);
        });

        let rejected = match &self.sender {
            Some(sender) => sender.send(job).err().map(|e| e.into_inner()),
            None => Some(job),
        };
        if let Some(job) = rejected {
            job(None);
        }
    }

    /// Initialize `root/subfolder`, creating the directory first.
    pub fn init<F>(&self, root: &Path, subfolder: &str, done: F)
    where
        F: FnOnce(Result<InitStatus, GitError>) + Send + 'static,
    {
        let path = root.join(subfolder);
        self.submit(
            "init",
            path,
            |git, path| {
                fs::create_dir_all(path)?;
                git.init(path)
            },
            done,
        );
    }

    pub fn stage<F>(&self, path: &Path, pattern: &str, done: F)
    where
        F: FnOnce(Result<(), GitError>) + Send + 'static,
    {
        let pattern = pattern.to_string();
        self.submit("stage", path.to_path_buf(), move |git, path| git.stage(path, &pattern), done);
    }

    pub fn commit<F>(&self, path: &Path, message: &str, done: F)
    where
        F: FnOnce(Result<(), GitError>) + Send + 'static,
    {
        let message = message.to_string();
        self.submit("commit", path.to_path_buf(), move |git, path| git.commit(path, &message), done);
    }

    pub fn push<F>(
        &self,
        path: &Path,
        remote: &str,
        credentials: Credentials,
        options: TransferOptions,
        done: F,
    ) where
        F: FnOnce(Result<(), GitError>) + Send + 'static,
    {
        let remote = remote.to_string();
        self.submit(
            "push",
            path.to_path_buf(),
            move |git, path| git.push(path, &remote, &credentials, options),
            done,
        );
    }

    pub fn pull<F>(
        &self,
        path: &Path,
        remote: &str,
        credentials: Credentials,
        options: TransferOptions,
        done: F,
    ) where
        F: FnOnce(Result<(), GitError>) + Send + 'static,
    {
        let remote = remote.to_string();
        self.submit(
            "pull",
            path.to_path_buf(),
            move |git, path| git.pull(path, &remote, &credentials, options),
            done,
        );
    }

    pub fn clone_repo<F>(
        &self,
        remote: &str,
        credentials: Credentials,
        destination: &Path,
        options: TransferOptions,
        done: F,
    ) where
        F: FnOnce(Result<(), GitError>) + Send + 'static,
    {
        let remote = remote.to_string();
        self.submit(
            "clone",
            destination.to_path_buf(),
            move |git, destination| git.clone_repo(&remote, &credentials, destination, options),
            done,
        );
    }

    /// Stop accepting work and wait for queued operations to finish.
    pub fn shutdown(&mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("git worker exited with a panic");
            }
        }
    }
}

impl Drop for GitPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}
