//! Persisted session record.
//!
//! The logged-in user is kept in a small JSON file shaped like
//! `{"user": {"_id": "...", "name": "...", "role": "..."}}`. The cart reads
//! its identity from here once at startup and receives it explicitly; nothing
//! in the store reads the file on its own.
//!
//! A missing file, an empty file, the literal `undefined`, or a user record
//! without `_id` all mean "nobody is logged in". A file that cannot be parsed
//! is deleted and treated the same way.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use agriverse_core::UserId;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SessionError;

/// Values a broken client may have written instead of a record.
const EMPTY_MARKERS: &[&str] = &["", "undefined", "null"];

/// User record as stored by the login flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// Backend user id. Absent for records written by older logins.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `Farmer` or `Buyer`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionRecord {
    #[serde(default)]
    user: Option<SessionUser>,
}

/// File-backed session record.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Use the session file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Use `agriverse/session.json` under [`dirs::data_local_dir`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoDataDir`] if the platform has no data directory.
    pub fn at_default_location() -> Result<Self, SessionError> {
        let dir = dirs::data_local_dir().ok_or(SessionError::NoDataDir)?;
        Ok(Self::new(dir.join("agriverse").join("session.json")))
    }

    /// Location of the session file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored user record.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse.
    pub fn read_user(&self) -> Result<Option<SessionUser>, SessionError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SessionError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if EMPTY_MARKERS.contains(&raw.trim()) {
            return Ok(None);
        }

        let record: SessionRecord = serde_json::from_str(&raw)?;
        Ok(record.user)
    }

    /// Identity of the logged-in user, if any.
    ///
    /// Never fails: unreadable records yield `None`, and a corrupt record is
    /// removed from disk.
    #[must_use]
    pub fn load_identity(&self) -> Option<UserId> {
        match self.read_user() {
            Ok(user) => user
                .and_then(|u| u.id)
                .filter(|id| !id.as_str().trim().is_empty()),
            Err(SessionError::Parse(e)) => {
                warn!(path = %self.path.display(), error = %e, "Discarding corrupt session record");
                if let Err(e) = self.clear() {
                    warn!(error = %e, "Failed to remove corrupt session record");
                }
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to read session record");
                None
            }
        }
    }

    /// Persist `user` as the logged-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or its parent directory cannot be written.
    pub fn save(&self, user: &SessionUser) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| SessionError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let record = SessionRecord {
            user: Some(user.clone()),
        };
        let body = serde_json::to_string_pretty(&record)?;
        std::fs::write(&self.path, body).map_err(|source| SessionError::Io {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = %self.path.display(), "Session record saved");
        Ok(())
    }

    /// Forget the logged-in user. Clearing an absent record is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Session record removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
