//! Input validation, run before any filesystem or network I/O.
//!
//! Every check returns [`GitNotesError::Validation`] with a message that can be
//! shown to the user as-is. Nothing here touches state.

use crate::error::{GitNotesError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static REPO_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap());

static CLASSIC_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ghp_[a-zA-Z0-9]{36}$").unwrap());

static FINE_GRAINED_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^github_pat_[a-zA-Z0-9]{22}_[a-zA-Z0-9]{59}$").unwrap());

static USERNAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9-]{0,38}$").unwrap());

static REMOTE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:https?|ssh|git)://[\w.@:/~-]+|git@[\w.-]+:[\w.@:/~-]+|file://\S+)$").unwrap()
});

/// Validates a repository name (user supplied or extracted from a URL).
/// Surrounding whitespace is tolerated and stripped.
pub fn repo_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if REPO_NAME.is_match(trimmed) {
        Ok(trimmed)
    } else {
        Err(GitNotesError::validation(format!(
            "Invalid repository name '{}'. Please use only alphanumeric characters, hyphens and underscores.",
            name
        )))
    }
}

/// Validates a personal access token: classic (`ghp_`) or fine-grained (`github_pat_`).
pub fn token(token: &str) -> Result<&str> {
    let trimmed = token.trim();
    if CLASSIC_TOKEN.is_match(trimmed) || FINE_GRAINED_TOKEN.is_match(trimmed) {
        Ok(trimmed)
    } else {
        Err(GitNotesError::validation("Not a valid personal access token"))
    }
}

/// Validates a username against GitHub login rules.
pub fn username(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if USERNAME.is_match(trimmed) && !trimmed.ends_with('-') && !trimmed.contains("--") {
        Ok(trimmed)
    } else {
        Err(GitNotesError::validation(format!(
            "Not a valid username: '{}'",
            name
        )))
    }
}

/// Validates a remote URL. Accepts http(s), ssh, git, scp-like `git@host:path`
/// and `file://` URLs.
pub fn remote_url(url: &str) -> Result<&str> {
    let trimmed = url.trim();
    if REMOTE_URL.is_match(trimmed) {
        Ok(trimmed)
    } else {
        Err(GitNotesError::validation(format!(
            "Invalid remote URL '{}'. Please use an https, ssh or file URL.",
            url
        )))
    }
}

/// Local remotes need no credentials.
pub fn is_local_remote(url: &str) -> bool {
    url.trim().starts_with("file://")
}
