//! Error types for session operations.

use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Session-specific errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// The backing storage could not be read or written
    #[error("Session backend error: {0}")]
    Backend(String),

    /// A lock guarding shared session data was poisoned by a panicking holder
    #[error("Session lock poisoned")]
    Poisoned,

    /// Empty or otherwise unusable key
    #[error("Invalid session key: {0:?}")]
    InvalidKey(String),
}

