//! Persisted session: the auth token and the logged-in user id.
//!
//! # Design
//! `SessionStore` is an injectable capability rather than ambient global
//! storage. Writers are last-write-wins; each store guards its map with an
//! `RwLock`. Absence of the auth token means "not authenticated".

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApiError, SessionError};

/// The two logical values a session holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKey {
    #[serde(rename = "authToken")]
    AuthToken,
    #[serde(rename = "userId")]
    UserId,
}

impl SessionKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKey::AuthToken => "authToken",
            SessionKey::UserId => "userId",
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable key/value storage for session data.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: SessionKey) -> Result<Option<String>, SessionError>;

    fn set(&self, key: SessionKey, value: &str) -> Result<(), SessionError>;

    /// Remove every key. Used at logout.
    fn clear(&self) -> Result<(), SessionError>;

    /// Read `key`, treating absence (or an empty value) as `MissingSession`.
    fn require(&self, key: SessionKey) -> Result<String, ApiError> {
        match self.get(key)? {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(ApiError::MissingSession(key)),
        }
    }

    fn is_authenticated(&self) -> bool {
        matches!(self.get(SessionKey::AuthToken), Ok(Some(token)) if !token.is_empty())
    }
}

type Entries = HashMap<SessionKey, String>;

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<Entries>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: SessionKey) -> Result<Option<String>, SessionError> {
        let entries = self.entries.read().map_err(|_| SessionError::Poisoned)?;
        Ok(entries.get(&key).cloned())
    }

    fn set(&self, key: SessionKey, value: &str) -> Result<(), SessionError> {
        let mut entries = self.entries.write().map_err(|_| SessionError::Poisoned)?;
        entries.insert(key, value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        self.entries
            .write()
            .map_err(|_| SessionError::Poisoned)?
            .clear();
        Ok(())
    }
}

/// JSON file backed store. The whole map is rewritten on every change via a
/// temp file and rename, so a crash never leaves a half-written session.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    entries: RwLock<Entries>,
}

impl FileSessionStore {
    /// Open the store at `path`, loading existing entries. A missing file is
    /// an empty session.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => Entries::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Entries::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), keys = entries.len(), "opened session store");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &Entries) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: SessionKey) -> Result<Option<String>, SessionError> {
        let entries = self.entries.read().map_err(|_| SessionError::Poisoned)?;
        Ok(entries.get(&key).cloned())
    }

    fn set(&self, key: SessionKey, value: &str) -> Result<(), SessionError> {
        let mut entries = self.entries.write().map_err(|_| SessionError::Poisoned)?;
        // Memory only changes once the file does.
        let mut next = entries.clone();
        next.insert(key, value.to_string());
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        let mut entries = self.entries.write().map_err(|_| SessionError::Poisoned)?;
        entries.clear();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
