// formseal - session-bound anti-forgery tokens
//
// This library issues, stores, and validates single-use tokens scoped to a
// logical context (usually one form), persisted through the application's
// session.

// Re-export core functionality
pub use formseal_csrf::*;

// Re-export supporting crates
pub use formseal_log as log;
pub use formseal_session as session;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        CsrfError, Encoder, HashToken, RequestParams, StoreConfig, TokenStore,
    };
    pub use formseal_session::{MemorySession, Session, SessionError, SessionStorage};
}
