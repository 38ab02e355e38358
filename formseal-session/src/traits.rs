//! Session storage trait and the session record type.

use crate::error::{SessionError, SessionResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// String-keyed, string-valued storage scoped to one client session.
///
/// Token stores read their serialized state from here once at construction
/// and write it back after every mutation. Implementations decide where the
/// data lives; the only contract is that a `set` is visible to a later `get`
/// for the same session.
///
/// # Examples
///
/// ```
/// use formseal_session::{MemorySession, SessionStorage};
///
/// let mut session = MemorySession::new();
/// session.set("csrf", "[]".to_string()).unwrap();
/// assert_eq!(session.get("csrf").unwrap().as_deref(), Some("[]"));
/// ```
pub trait SessionStorage {
    /// Read the value stored under `key`, `None` if absent.
    fn get(&self, key: &str) -> SessionResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: String) -> SessionResult<()>;

    /// Remove `key`, returning the previous value.
    fn remove(&mut self, key: &str) -> SessionResult<Option<String>>;

    /// Check whether `key` holds a value.
    fn contains(&self, key: &str) -> SessionResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

impl<S: SessionStorage + ?Sized> SessionStorage for &mut S {
    fn get(&self, key: &str) -> SessionResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: String) -> SessionResult<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> SessionResult<Option<String>> {
        (**self).remove(key)
    }
}

impl<S: SessionStorage + ?Sized> SessionStorage for Box<S> {
    fn get(&self, key: &str) -> SessionResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: String) -> SessionResult<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> SessionResult<Option<String>> {
        (**self).remove(key)
    }
}

/// A session record as an application would load it from its own backend.
///
/// Embedders that keep sessions in a database or cache deserialize one of
/// these per request, hand it to the token store, and write it back with
/// [`Session::to_json`] once the request is done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier
    pub id: String,
    /// Session data as key-value pairs
    pub data: HashMap<String, String>,
    /// Session creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last write timestamp
    pub last_accessed_at: DateTime<Utc>,
}

impl Session {
    /// Create an empty session with the given ID.
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            data: HashMap::new(),
            created_at: now,
            last_accessed_at: now,
        }
    }

    /// Create an empty session with a fresh random ID.
    pub fn generate() -> Self {
        Self::new(generate_session_id())
    }

    /// Update the last accessed timestamp.
    pub fn touch(&mut self) {
        self.last_accessed_at = Utc::now();
    }

    /// Serialize the whole record.
    pub fn to_json(&self) -> SessionResult<String> {
        serde_json::to_string(self).map_err(|e| SessionError::Serialization(e.to_string()))
    }

    /// Restore a record produced by [`Session::to_json`].
    pub fn from_json(raw: &str) -> SessionResult<Self> {
        serde_json::from_str(raw).map_err(|e| SessionError::Deserialization(e.to_string()))
    }
}

impl SessionStorage for Session {
    fn get(&self, key: &str) -> SessionResult<Option<String>> {
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> SessionResult<()> {
        if key.is_empty() {
            return Err(SessionError::InvalidKey(key.to_string()));
        }
        self.data.insert(key.to_string(), value);
        self.touch();
        Ok(())
    }

    fn remove(&mut self, key: &str) -> SessionResult<Option<String>> {
        let previous = self.data.remove(key);
        if previous.is_some() {
            self.touch();
        }
        Ok(previous)
    }
}

/// Generate a new unique session ID.
pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
