//! # Configuration
//!
//! Gitnotes configuration is managed by [`clapfig`], which handles layered loading
//! from TOML files, environment variables, and programmatic overrides.
//!
//! ## Storage Hierarchy
//!
//! Configuration is resolved in priority order:
//! 1. **Environment variables**: `GITNOTES__WORKER_THREADS`, `GITNOTES__MISSING_LINK`, etc.
//! 2. **Data directory config**: `<data dir>/gitnotes.toml`.
//! 3. **Compiled Defaults**: Built-in fallbacks via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `worker_threads` | `2` | Git worker pool size (never below 2) |
//! | `missing_link` | `No remote link` | Remote link shown for trees without `.metadata` |
//! | `commit_message_format` | `Commit at: %Y%m%d_%H%M%S` | chrono format for push commits |
//! | `author_name` | `gitnotes` | Commit author when git config has none |
//! | `author_email` | `gitnotes@localhost` | Commit email when git config has none |
//! | `transfer_timeout_secs` | `120` | Abort network transfers after this long (0 = never) |
//! | `prune_deleted` | `false` | Remove note files with no live note before pushing |

use chrono::Utc;
use confique::Config;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const MIN_WORKER_THREADS: usize = 2;

/// Configuration for gitnotes, stored in `gitnotes.toml`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GitNotesConfig {
    /// Number of threads executing git operations.
    #[config(default = 2)]
    pub worker_threads: usize,

    /// Remote link recorded for working trees with no `.metadata` sidecar.
    #[config(default = "No remote link")]
    pub missing_link: String,

    /// chrono format string used to build push commit messages.
    #[config(default = "Commit at: %Y%m%d_%H%M%S")]
    pub commit_message_format: String,

    #[config(default = "gitnotes")]
    pub author_name: String,

    #[config(default = "gitnotes@localhost")]
    pub author_email: String,

    /// Seconds after which a network transfer is aborted. 0 disables the deadline.
    #[config(default = 120)]
    pub transfer_timeout_secs: u64,

    /// Delete `.txt` files without a live note before staging a push.
    #[config(default = false)]
    pub prune_deleted: bool,
}

impl Default for GitNotesConfig {
    fn default() -> Self {
        Self {
            worker_threads: MIN_WORKER_THREADS,
            missing_link: "No remote link".to_string(),
            commit_message_format: "Commit at: %Y%m%d_%H%M%S".to_string(),
            author_name: "gitnotes".to_string(),
            author_email: "gitnotes@localhost".to_string(),
            transfer_timeout_secs: 120,
            prune_deleted: false,
        }
    }
}

impl GitNotesConfig {
    /// Pool size, clamped so a long push never starves a pull elsewhere.
    pub fn worker_threads(&self) -> usize {
        self.worker_threads.max(MIN_WORKER_THREADS)
    }

    pub fn transfer_timeout(&self) -> Option<Duration> {
        (self.transfer_timeout_secs > 0).then(|| Duration::from_secs(self.transfer_timeout_secs))
    }

    pub fn commit_message(&self) -> String {
        Utc::now().format(&self.commit_message_format).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GitNotesConfig::default();
        assert_eq!(config.worker_threads(), 2);
        assert_eq!(config.missing_link, "No remote link");
        assert!(!config.prune_deleted);
    }

    #[test]
    fn test_worker_threads_never_below_two() {
        let config = GitNotesConfig {
            worker_threads: 1,
            ..Default::default()
        };
        assert_eq!(config.worker_threads(), 2);

        let config = GitNotesConfig {
            worker_threads: 6,
            ..Default::default()
        };
        assert_eq!(config.worker_threads(), 6);
    }

    #[test]
    fn test_transfer_timeout_zero_disables() {
        let config = GitNotesConfig {
            transfer_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.transfer_timeout().is_none());
        assert_eq!(
            GitNotesConfig::default().transfer_timeout(),
            Some(Duration::from_secs(120))
        );
    }

    #[test]
    fn test_commit_message_uses_format() {
        let config = GitNotesConfig::default();
        let message = config.commit_message();
        assert!(message.starts_with("Commit at: "));
        // yyyyMMdd_HHmmss
        assert_eq!(message.len(), "Commit at: ".len() + 15);
    }
}
