use crate::error::{CsrfError, Result};
use crate::token::check_hash_size;
use serde::Deserialize;
use std::env;
use std::str::FromStr;

/// Token store configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Session key under which the token list is stored
    pub session_key: String,

    /// Request parameter / form field carrying the token
    pub input_field_name: String,

    /// Default token time-to-live in seconds (0 = never expires)
    pub default_ttl: i64,

    /// Length of issued token values in hex characters
    pub hash_size: usize,

    /// Tokens kept per context when a new one is issued
    pub max_retained: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            session_key: "csrf_tokens".to_string(),
            input_field_name: "csrf_token".to_string(),
            default_ttl: 3600, // 1 hour
            hash_size: 64,
            max_retained: 5,
        }
    }
}

impl StoreConfig {
    /// Create a configuration with defaults and the given session key
    pub fn new(session_key: impl Into<String>) -> Self {
        Self {
            session_key: session_key.into(),
            ..Default::default()
        }
    }

    /// Load configuration from `FORMSEAL_*` environment variables, reading a
    /// `.env` file first if one exists. Unset variables keep their defaults.
    ///
    /// - `FORMSEAL_SESSION_KEY`
    /// - `FORMSEAL_INPUT_FIELD`
    /// - `FORMSEAL_DEFAULT_TTL`
    /// - `FORMSEAL_HASH_SIZE`
    /// - `FORMSEAL_MAX_RETAINED`
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(key) = lookup("FORMSEAL_SESSION_KEY") {
            config.session_key = key;
        }
        if let Some(field) = lookup("FORMSEAL_INPUT_FIELD") {
            config.input_field_name = field;
        }
        if let Some(ttl) = lookup("FORMSEAL_DEFAULT_TTL") {
            config.default_ttl = parse_var("FORMSEAL_DEFAULT_TTL", &ttl)?;
        }
        if let Some(size) = lookup("FORMSEAL_HASH_SIZE") {
            config.hash_size = parse_var("FORMSEAL_HASH_SIZE", &size)?;
        }
        if let Some(keep) = lookup("FORMSEAL_MAX_RETAINED") {
            config.max_retained = parse_var("FORMSEAL_MAX_RETAINED", &keep)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Set session key
    pub fn with_session_key(mut self, key: impl Into<String>) -> Self {
        self.session_key = key.into();
        self
    }

    /// Set input field name
    pub fn with_input_field_name(mut self, name: impl Into<String>) -> Self {
        self.input_field_name = name.into();
        self
    }

    /// Set default TTL
    pub fn with_default_ttl(mut self, ttl_seconds: i64) -> Self {
        self.default_ttl = ttl_seconds;
        self
    }

    /// Set hash size
    pub fn with_hash_size(mut self, hash_size: usize) -> Self {
        self.hash_size = hash_size;
        self
    }

    /// Set how many tokens per context survive an issue
    pub fn with_max_retained(mut self, keep: i64) -> Self {
        self.max_retained = keep;
        self
    }

    /// Check the configuration before a store is built from it.
    pub fn validate(&self) -> Result<()> {
        if self.session_key.is_empty() {
            return Err(CsrfError::Config("session key must not be empty".to_string()));
        }
        if self.input_field_name.is_empty() {
            return Err(CsrfError::Config(
                "input field name must not be empty".to_string(),
            ));
        }
        if self.default_ttl < 0 {
            return Err(CsrfError::Config(format!(
                "default TTL must be 0 or positive, got {}",
                self.default_ttl
            )));
        }
        check_hash_size(self.hash_size)
    }
}

fn parse_var<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| CsrfError::Config(format!("{name}: cannot parse {raw:?}")))
}
