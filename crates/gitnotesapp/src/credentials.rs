//! Username and personal access token storage.
//!
//! Values are opaque strings here. Format checks happen in
//! [`crate::validate`] before anything reaches a store, and the git pipeline
//! receives a [`Credentials`] copy per call without caching it.

use crate::error::{GitNotesError, Result};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

pub const CREDENTIALS_FILE: &str = "credentials.json";

/// Username used for token auth when none was stored.
pub const TOKEN_USERNAME: &str = "token";

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Credentials {
    pub fn new(username: Option<String>, token: Option<String>) -> Self {
        Self { username, token }
    }

    /// Username to present alongside the token.
    pub fn auth_username(&self) -> &str {
        self.username.as_deref().unwrap_or(TOKEN_USERNAME)
    }

    pub fn has_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

pub trait CredentialStore {
    fn load(&self) -> Result<Credentials>;

    fn save(&self, credentials: &Credentials) -> Result<()>;

    fn username(&self) -> Result<Option<String>> {
        Ok(self.load()?.username)
    }

    fn set_username(&self, username: &str) -> Result<()> {
        let mut credentials = self.load()?;
        credentials.username = Some(username.to_string());
        self.save(&credentials)
    }

    fn token(&self) -> Result<Option<String>> {
        Ok(self.load()?.token)
    }

    fn set_token(&self, token: &str) -> Result<()> {
        let mut credentials = self.load()?;
        credentials.token = Some(token.to_string());
        self.save(&credentials)
    }
}

/// `credentials.json` in the data directory.
pub struct FsCredentialStore {
    root: PathBuf,
}

impl FsCredentialStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(CREDENTIALS_FILE)
    }
}

impl CredentialStore for FsCredentialStore {
    fn load(&self) -> Result<Credentials> {
        let path = self.path();
        if !path.exists() {
            return Ok(Credentials::default());
        }
        let content = fs::read_to_string(path).map_err(GitNotesError::Io)?;
        serde_json::from_str(&content).map_err(GitNotesError::Serialization)
    }

    fn save(&self, credentials: &Credentials) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let content = serde_json::to_string_pretty(credentials)?;
        let tmp_file = self.root.join(format!(".credentials-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp_file, content)?;
        fs::rename(&tmp_file, self.path())?;
        Ok(())
    }
}

/// In-memory credentials for tests.
#[derive(Default)]
pub struct MemCredentialStore {
    credentials: RefCell<Credentials>,
}

impl MemCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials: RefCell::new(credentials),
        }
    }
}

impl CredentialStore for MemCredentialStore {
    fn load(&self) -> Result<Credentials> {
        Ok(self.credentials.borrow().clone())
    }

    fn save(&self, credentials: &Credentials) -> Result<()> {
        *self.credentials.borrow_mut() = credentials.clone();
        Ok(())
    }
}
