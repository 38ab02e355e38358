use crate::error::{CsrfError, Result};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

/// One issued anti-forgery credential.
///
/// Tokens are immutable once generated. They are owned by a
/// [`TokenStore`](crate::TokenStore) and only ever leave it as their string
/// value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashToken {
    value: String,
    context: String,
    expires_at: Option<DateTime<Utc>>,
}

impl HashToken {
    /// Generate a new token.
    ///
    /// `hash_size` is the length of the hex-encoded value and must be a
    /// positive even number; any other size is rejected with
    /// [`CsrfError::InvalidHashSize`]. A `ttl_seconds` of zero or less
    /// produces a token that never expires.
    pub fn generate(context: impl Into<String>, ttl_seconds: i64, hash_size: usize) -> Result<Self> {
        check_hash_size(hash_size)?;

        let mut bytes = vec![0u8; hash_size / 2];
        let mut rng = OsRng;
        rng.try_fill_bytes(&mut bytes)
            .map_err(|e| CsrfError::RandomSource(e.to_string()))?;

        let expires_at = if ttl_seconds > 0 {
            let ttl = Duration::try_seconds(ttl_seconds)
                .ok_or_else(|| CsrfError::Config(format!("time-to-live {ttl_seconds}s out of range")))?;
            let expiry = Utc::now()
                .checked_add_signed(ttl)
                .ok_or_else(|| CsrfError::Config(format!("time-to-live {ttl_seconds}s out of range")))?;
            Some(expiry)
        } else {
            None
        };

        Ok(Self {
            value: hex::encode(bytes),
            context: context.into(),
            expires_at,
        })
    }

    /// Rebuild a token from stored fields.
    pub fn from_parts(
        value: impl Into<String>,
        context: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            value: value.into(),
            context: context.into(),
            expires_at,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// Absolute expiry, `None` if the token never expires.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Check if token is expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check expiry against an explicit instant. A token is expired from its
    /// expiry instant onward.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expiry) if expiry <= now)
    }

    pub fn matches_context(&self, context: &str) -> bool {
        self.context == context
    }

    /// Check a presented value against this token.
    pub fn verify(&self, candidate: &str, context: &str) -> bool {
        self.verify_at(candidate, context, Utc::now())
    }

    /// Same as [`verify`](Self::verify) at an explicit instant.
    ///
    /// Every check runs regardless of the others, and the value comparison
    /// does not stop at the first differing byte.
    pub fn verify_at(&self, candidate: &str, context: &str, now: DateTime<Utc>) -> bool {
        let value_matches =
            constant_time_eq::constant_time_eq(candidate.as_bytes(), self.value.as_bytes());
        let context_matches = self.matches_context(context);
        let expired = self.is_expired_at(now);

        value_matches & context_matches & !expired
    }
}

pub(crate) fn check_hash_size(hash_size: usize) -> Result<()> {
    if hash_size == 0 || hash_size % 2 != 0 {
        return Err(CsrfError::InvalidHashSize(hash_size));
    }
    Ok(())
}
