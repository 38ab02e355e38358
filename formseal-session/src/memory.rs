//! In-memory session storage.

use crate::error::{SessionError, SessionResult};
use crate::traits::SessionStorage;
use formseal_log::trace;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Process-local session storage.
///
/// Clones share the same underlying map, so a handle can be given to one
/// request-scoped token store while another handle inspects or reuses the
/// data for the next request. Every successful `set` or `remove` bumps a
/// shared write counter.
#[derive(Debug, Clone, Default)]
pub struct MemorySession {
    data: Arc<Mutex<HashMap<String, String>>>,
    writes: Arc<AtomicUsize>,
}

impl MemorySession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes (`set` and effective `remove`) performed so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> SessionResult<usize> {
        Ok(self.data.lock().map_err(|_| SessionError::Poisoned)?.len())
    }

    pub fn is_empty(&self) -> SessionResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Copy of every stored entry.
    pub fn snapshot(&self) -> SessionResult<HashMap<String, String>> {
        Ok(self.data.lock().map_err(|_| SessionError::Poisoned)?.clone())
    }
}

impl SessionStorage for MemorySession {
    fn get(&self, key: &str) -> SessionResult<Option<String>> {
        let data = self.data.lock().map_err(|_| SessionError::Poisoned)?;
        Ok(data.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> SessionResult<()> {
        if key.is_empty() {
            return Err(SessionError::InvalidKey(key.to_string()));
        }

        let mut data = self.data.lock().map_err(|_| SessionError::Poisoned)?;
        trace!("session write: key={} bytes={}", key, value.len());
        data.insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> SessionResult<Option<String>> {
        let mut data = self.data.lock().map_err(|_| SessionError::Poisoned)?;
        let previous = data.remove(key);
        if previous.is_some() {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(previous)
    }
}
