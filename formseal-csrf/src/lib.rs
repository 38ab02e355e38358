//! # formseal CSRF tokens
//!
//! Session-bound anti-forgery tokens for HTML forms and script clients.
//!
//! ## Features
//!
//! - **Context scoping** - independent token pools per form or action
//! - **Single use** - a token is consumed by its first successful check
//! - **Bounded retention** - only the newest tokens per context are kept
//! - **Constant-time checks** - value comparison does not leak prefixes
//! - **Pluggable sessions** - any [`SessionStorage`] backs the store
//!
//! ## Quick Start
//!
//! ```rust
//! use formseal_csrf::{RequestParams, StoreConfig, TokenStore};
//! use formseal_session::MemorySession;
//!
//! let session = MemorySession::new();
//! let config = StoreConfig::new("csrf_tokens").with_default_ttl(1800);
//!
//! // Rendering the form
//! let mut store = TokenStore::new(config.clone(), session.clone()).unwrap();
//! let field = store.html_input("profile").unwrap();
//! assert!(field.starts_with("<input type=\"hidden\""));
//! let value = store.list_values("profile", Some(1)).remove(0);
//!
//! // Handling the submission in a later request
//! let request = RequestParams::new().with_post("csrf_token", value);
//! let mut store = TokenStore::new(config, session).unwrap().with_request(request);
//! assert!(store.validate_and_consume("profile", None).unwrap());
//! ```
//!
//! ## Token Lifetime
//!
//! ```rust
//! use formseal_csrf::HashToken;
//!
//! // 64 hex characters, valid for an hour
//! let token = HashToken::generate("", 3600, 64).unwrap();
//! assert_eq!(token.value().len(), 64);
//! assert!(!token.is_expired());
//!
//! // A TTL of zero never expires
//! let forever = HashToken::generate("", 0, 64).unwrap();
//! assert!(forever.expires_at().is_none());
//! ```

pub mod config;
pub mod error;
pub mod params;
pub mod render;
pub mod store;
pub mod token;

pub use config::StoreConfig;
pub use error::{CsrfError, Result};
pub use formseal_session::SessionStorage;
pub use params::RequestParams;
pub use render::Encoder;
pub use store::TokenStore;
pub use token::HashToken;
