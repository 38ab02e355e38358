use crate::error::{CsrfError, Result};
use std::collections::HashMap;

/// Request parameters consulted when a token value is not passed explicitly.
///
/// Holds the submitted form fields (`post`) and the query string fields
/// (`get`). Lookups prefer the form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    post: HashMap<String, String>,
    get: HashMap<String, String>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_maps(post: HashMap<String, String>, get: HashMap<String, String>) -> Self {
        Self { post, get }
    }

    /// Parse an `application/x-www-form-urlencoded` body into the form fields.
    pub fn with_form_body(mut self, body: &[u8]) -> Result<Self> {
        self.post.extend(decode_pairs(
            serde_urlencoded::from_bytes::<Vec<(String, String)>>(body),
        )?);
        Ok(self)
    }

    /// Parse a query string (without the leading `?`) into the query fields.
    pub fn with_query(mut self, query: &str) -> Result<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);
        self.get.extend(decode_pairs(
            serde_urlencoded::from_str::<Vec<(String, String)>>(query),
        )?);
        Ok(self)
    }

    /// Add a single form field.
    pub fn with_post(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.post.insert(name.into(), value.into());
        self
    }

    /// Add a single query field.
    pub fn with_get(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.get.insert(name.into(), value.into());
        self
    }

    /// Look up `name`, form fields first, then the query string.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.post
            .get(name)
            .or_else(|| self.get.get(name))
            .map(String::as_str)
    }

    pub fn post(&self) -> &HashMap<String, String> {
        &self.post
    }

    pub fn get(&self) -> &HashMap<String, String> {
        &self.get
    }
}

// Repeated keys keep the last occurrence, matching how form-handling
// frameworks usually flatten them.
fn decode_pairs(
    parsed: std::result::Result<Vec<(String, String)>, serde_urlencoded::de::Error>,
) -> Result<HashMap<String, String>> {
    let pairs = parsed.map_err(|e| CsrfError::InvalidRequest(e.to_string()))?;
    Ok(pairs.into_iter().collect())
}
