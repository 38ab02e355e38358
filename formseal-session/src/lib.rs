//! Session storage for formseal token stores.
//!
//! Token stores never talk to a session backend directly. They receive a
//! [`SessionStorage`] implementation, read their serialized token list from
//! it once per request, and write the list back after each mutation.
//!
//! Two implementations ship with this crate:
//!
//! - [`MemorySession`] - shared in-process map, handy for tests and for
//!   single-process servers
//! - [`Session`] - a serializable session record an application loads from
//!   and saves to its own backend
//!
//! # Examples
//!
//! ```
//! use formseal_session::{Session, SessionStorage};
//!
//! # fn main() -> Result<(), formseal_session::SessionError> {
//! let mut session = Session::generate();
//! session.set("csrf_tokens", "[]".to_string())?;
//!
//! // Persist the record wherever the application keeps sessions.
//! let stored = session.to_json()?;
//! let restored = Session::from_json(&stored)?;
//! assert_eq!(restored.get("csrf_tokens")?.as_deref(), Some("[]"));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{SessionError, SessionResult};
pub use memory::MemorySession;
pub use traits::{Session, SessionStorage, generate_session_id};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{SessionError, SessionResult};
    pub use crate::memory::MemorySession;
    pub use crate::traits::{Session, SessionStorage, generate_session_id};
}
