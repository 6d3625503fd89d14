//! Durable credential storage
//!
//! A plain key/value store plus [`SessionMirror`], which maps a [`Session`]
//! onto the two stable keys. The store holds no logic of its own; the
//! session manager is the only writer.

#[cfg(test)]
mod memory;
mod sqlite;

#[cfg(test)]
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::session::Session;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Key holding the raw bearer token
pub const TOKEN_KEY: &str = "token";
/// Key holding the JSON user profile
pub const USER_KEY: &str = "user";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Corrupt stored value: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable key/value persistence
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write every entry or none of them
    fn put(&self, entries: &[(&str, &str)]) -> StoreResult<()>;

    /// Remove keys; missing keys are not an error
    fn delete(&self, keys: &[&str]) -> StoreResult<()>;
}

impl<T: CredentialStore + ?Sized> CredentialStore for Arc<T> {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key)
    }

    fn put(&self, entries: &[(&str, &str)]) -> StoreResult<()> {
        (**self).put(entries)
    }

    fn delete(&self, keys: &[&str]) -> StoreResult<()> {
        (**self).delete(keys)
    }
}

/// Profile as persisted under [`USER_KEY`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredProfile {
    id: String,
    name: String,
    #[serde(default)]
    email: String,
    issued_at: DateTime<Utc>,
}

/// Reads and writes a [`Session`] through a [`CredentialStore`]
#[derive(Clone)]
pub struct SessionMirror {
    store: Arc<dyn CredentialStore>,
}

impl SessionMirror {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Load the persisted session.
    ///
    /// Only a complete, parseable pair of entries counts. Anything partial or
    /// corrupt is wiped and reported as absent.
    pub fn load(&self) -> StoreResult<Option<Session>> {
        let token = self.store.get(TOKEN_KEY)?;
        let user = self.store.get(USER_KEY)?;

        let session = match (token, user) {
            (None, None) => return Ok(None),
            (Some(token), Some(user)) => Self::decode(token, &user),
            _ => None,
        };

        if session.is_none() {
            tracing::warn!("Discarding incomplete persisted session");
            self.clear()?;
        }
        Ok(session)
    }

    pub fn save(&self, session: &Session) -> StoreResult<()> {
        let profile = StoredProfile {
            id: session.user_id.clone(),
            name: session.display_name.clone(),
            email: session.email.clone(),
            issued_at: session.issued_at,
        };
        let user = serde_json::to_string(&profile)?;
        self.store
            .put(&[(TOKEN_KEY, session.token.as_str()), (USER_KEY, user.as_str())])
    }

    pub fn clear(&self) -> StoreResult<()> {
        self.store.delete(&[TOKEN_KEY, USER_KEY])
    }

    /// Whether anything is persisted under either key
    pub fn is_present(&self) -> StoreResult<bool> {
        Ok(self.store.get(TOKEN_KEY)?.is_some() || self.store.get(USER_KEY)?.is_some())
    }

    fn decode(token: String, user: &str) -> Option<Session> {
        let profile: StoredProfile = serde_json::from_str(user).ok()?;
        let session = Session {
            user_id: profile.id,
            display_name: profile.name,
            email: profile.email,
            token,
            issued_at: profile.issued_at,
        };
        session.is_well_formed().then_some(session)
    }
}
