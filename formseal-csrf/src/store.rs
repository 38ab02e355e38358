use crate::config::StoreConfig;
use crate::error::Result;
use crate::params::RequestParams;
use crate::token::HashToken;
use chrono::Utc;
use formseal_log::{debug, warn};
use formseal_session::SessionStorage;

/// Session-bound collection of issued tokens.
///
/// A store is built once per request. On construction it reads the token
/// list saved under [`StoreConfig::session_key`], and every operation that
/// changes the list writes it back before returning. Operations that change
/// nothing never touch the session.
///
/// Tokens are kept in insertion order; "newest" always means closest to the
/// end of the list.
///
/// # Examples
///
/// ```
/// use formseal_csrf::{StoreConfig, TokenStore};
/// use formseal_session::MemorySession;
///
/// let session = MemorySession::new();
/// let mut store = TokenStore::new(StoreConfig::default(), session.clone()).unwrap();
///
/// let token = store.issue("comment-form").unwrap();
/// assert!(store.validate_and_consume("comment-form", Some(token.value())).unwrap());
/// assert!(!store.validate_and_consume("comment-form", Some(token.value())).unwrap());
/// ```
#[derive(Debug)]
pub struct TokenStore<S: SessionStorage> {
    config: StoreConfig,
    session: S,
    request: RequestParams,
    tokens: Vec<HashToken>,
}

impl<S: SessionStorage> TokenStore<S> {
    /// Validate `config` and load any tokens already stored in `session`.
    pub fn new(config: StoreConfig, session: S) -> Result<Self> {
        config.validate()?;

        let mut store = Self {
            config,
            session,
            request: RequestParams::default(),
            tokens: Vec::new(),
        };
        store.load()?;
        Ok(store)
    }

    /// Attach the current request's parameters, used by
    /// [`validate_and_consume`](Self::validate_and_consume) when no value is
    /// passed explicitly.
    pub fn with_request(mut self, request: RequestParams) -> Self {
        self.request = request;
        self
    }

    pub fn set_request(&mut self, request: RequestParams) {
        self.request = request;
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Give the session back, e.g. to save it to the application's backend.
    pub fn into_session(self) -> S {
        self.session
    }

    /// All live tokens, oldest first.
    pub fn tokens(&self) -> &[HashToken] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Values of the tokens in `context`, newest first, at most `limit` of
    /// them when a limit is given.
    pub fn list_values(&self, context: &str, limit: Option<usize>) -> Vec<String> {
        self.tokens
            .iter()
            .rev()
            .filter(|token| token.matches_context(context))
            .take(limit.unwrap_or(usize::MAX))
            .map(|token| token.value().to_string())
            .collect()
    }

    /// Delete the tokens in `context` except the newest `keep`.
    ///
    /// A `keep` of zero or less deletes every token in the context. Returns
    /// how many tokens were deleted; the session is written only when that
    /// number is non-zero.
    pub fn prune(&mut self, context: &str, keep: i64) -> Result<usize> {
        let mut tokens = self.tokens.clone();
        let deleted = prune_oldest(&mut tokens, context, keep);
        if deleted == 0 {
            return Ok(0);
        }

        self.commit(tokens)?;
        debug!("pruned {} token(s) from context {:?}", deleted, context);
        Ok(deleted)
    }

    /// Issue a token for `context` with the configured TTL and retention.
    pub fn issue(&mut self, context: &str) -> Result<HashToken> {
        self.issue_with(context, None, self.config.max_retained)
    }

    /// Issue a token for `context`.
    ///
    /// `ttl_seconds` of `None` or a negative value falls back to the
    /// configured default; `Some(0)` issues a token that never expires.
    /// After appending, the context is pruned down to `max_retained` tokens
    /// (see [`prune`](Self::prune) for how non-positive values behave). The
    /// session is written exactly once.
    pub fn issue_with(
        &mut self,
        context: &str,
        ttl_seconds: Option<i64>,
        max_retained: i64,
    ) -> Result<HashToken> {
        let ttl = match ttl_seconds {
            Some(ttl) if ttl >= 0 => ttl,
            _ => self.config.default_ttl,
        };

        let token = HashToken::generate(context, ttl, self.config.hash_size)?;
        let mut tokens = self.tokens.clone();
        tokens.push(token.clone());
        prune_oldest(&mut tokens, context, max_retained);
        self.commit(tokens)?;

        debug!(
            "issued token for context {:?} (ttl={}s, {} stored)",
            context,
            ttl,
            self.tokens.len()
        );
        Ok(token)
    }

    /// Check a presented token and consume it on success.
    ///
    /// With `candidate` set to `None` the value is taken from the attached
    /// request parameters under [`StoreConfig::input_field_name`], form
    /// fields first. The newest token that verifies against the value and
    /// `context` is removed and the session written. Absent values and
    /// failed checks return `false` without touching the session.
    pub fn validate_and_consume(&mut self, context: &str, candidate: Option<&str>) -> Result<bool> {
        let candidate = match candidate {
            Some(value) => value.to_string(),
            None => match self.request.lookup(&self.config.input_field_name) {
                Some(value) => value.to_string(),
                None => {
                    debug!("no token presented for context {:?}", context);
                    return Ok(false);
                }
            },
        };

        let now = Utc::now();
        let Some(position) = self
            .tokens
            .iter()
            .rposition(|token| token.verify_at(&candidate, context, now))
        else {
            debug!("token rejected for context {:?}", context);
            return Ok(false);
        };

        let mut tokens = self.tokens.clone();
        tokens.remove(position);
        self.commit(tokens)?;
        debug!("token consumed for context {:?}", context);
        Ok(true)
    }

    /// Write the full token list to the session, replacing what was there.
    pub fn persist(&mut self) -> Result<()> {
        let encoded = serde_json::to_string(&self.tokens)?;
        self.session.set(&self.config.session_key, encoded)?;
        Ok(())
    }

    // The in-memory list only changes once the session accepted the write.
    fn commit(&mut self, tokens: Vec<HashToken>) -> Result<()> {
        let encoded = serde_json::to_string(&tokens)?;
        self.session.set(&self.config.session_key, encoded)?;
        self.tokens = tokens;
        Ok(())
    }

    // Stored tokens are assumed to be roughly chronological: the newest run
    // of unexpired tokens is kept and everything from the newest expired
    // token backward is dropped, even entries that would still verify.
    fn load(&mut self) -> Result<()> {
        let Some(raw) = self.session.get(&self.config.session_key)? else {
            return Ok(());
        };

        let mut stored = match decode_tokens(&raw) {
            Some(tokens) => tokens,
            None => {
                warn!(
                    "ignoring unreadable token state under session key {:?}",
                    self.config.session_key
                );
                return Ok(());
            }
        };

        let now = Utc::now();
        let fresh = stored
            .iter()
            .rev()
            .take_while(|token| !token.is_expired_at(now))
            .count();
        let dropped = stored.len() - fresh;
        stored.drain(..dropped);

        if dropped > 0 {
            self.commit(stored)?;
            debug!("dropped {} expired token(s) on load", dropped);
        } else {
            self.tokens = stored;
        }
        Ok(())
    }
}

// Deletes matches of `context` oldest first until only the newest `keep`
// remain; a `keep` of zero or less deletes them all.
fn prune_oldest(tokens: &mut Vec<HashToken>, context: &str, keep: i64) -> usize {
    let keep = usize::try_from(keep).unwrap_or(0);
    let matching = tokens
        .iter()
        .filter(|token| token.matches_context(context))
        .count();

    let deleted = matching.saturating_sub(keep);
    let mut remaining = deleted;
    tokens.retain(|token| {
        if remaining > 0 && token.matches_context(context) {
            remaining -= 1;
            false
        } else {
            true
        }
    });
    deleted
}

fn decode_tokens(raw: &str) -> Option<Vec<HashToken>> {
    let tokens: Vec<HashToken> = serde_json::from_str(raw).ok()?;
    if tokens.iter().any(|token| token.value().is_empty()) {
        return None;
    }
    Some(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CsrfError;
    use chrono::Duration;
    use formseal_session::MemorySession;

    const KEY: &str = "csrf_tokens";

    fn store(session: &MemorySession) -> TokenStore<MemorySession> {
        TokenStore::new(StoreConfig::default(), session.clone()).unwrap()
    }

    fn seed(session: &mut MemorySession, tokens: &[HashToken]) {
        session
            .set(KEY, serde_json::to_string(tokens).unwrap())
            .unwrap();
    }

    #[test]
    fn test_new_store_is_empty_and_silent() {
        let session = MemorySession::new();
        let store = store(&session);
        assert!(store.is_empty());
        assert_eq!(session.write_count(), 0);
    }

    #[test]
    fn test_issue_persists_once() {
        let session = MemorySession::new();
        let mut store = store(&session);

        store.issue("").unwrap();
        assert_eq!(session.write_count(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_issue_persists_once_when_pruning() {
        let session = MemorySession::new();
        let mut store = store(&session);
        for _ in 0..5 {
            store.issue("").unwrap();
        }
        let before = session.write_count();

        store.issue("").unwrap();
        assert_eq!(store.len(), 5);
        assert_eq!(session.write_count(), before + 1);
    }

    #[test]
    fn test_issue_uses_default_ttl() {
        let session = MemorySession::new();
        let config = StoreConfig::default().with_default_ttl(0);
        let mut store = TokenStore::new(config, session).unwrap();

        assert_eq!(store.issue("").unwrap().expires_at(), None);
        assert_eq!(store.issue_with("", Some(-1), 5).unwrap().expires_at(), None);
        assert!(store.issue_with("", Some(30), 5).unwrap().expires_at().is_some());
    }

    #[test]
    fn test_issue_uses_configured_hash_size() {
        let config = StoreConfig::default().with_hash_size(16);
        let mut store = TokenStore::new(config, MemorySession::new()).unwrap();
        assert_eq!(store.issue("").unwrap().value().len(), 16);
    }

    #[test]
    fn test_issue_with_zero_retention_keeps_nothing() {
        let session = MemorySession::new();
        let mut store = store(&session);

        store.issue_with("", None, 0).unwrap();
        assert!(store.is_empty());
        assert_eq!(session.write_count(), 1);
    }

    #[test]
    fn test_verify_after_issue() {
        let mut store = store(&MemorySession::new());
        let token = store.issue("signup").unwrap();

        assert!(token.verify(token.value(), "signup"));
        assert!(!token.verify(token.value(), ""));
        assert!(!store.validate_and_consume("", Some(token.value())).unwrap());
        assert!(store.validate_and_consume("signup", Some(token.value())).unwrap());
    }

    #[test]
    fn test_single_use() {
        let session = MemorySession::new();
        let mut store = store(&session);
        let token = store.issue("ctx").unwrap();
        let writes = session.write_count();

        assert!(store.validate_and_consume("ctx", Some(token.value())).unwrap());
        assert_eq!(session.write_count(), writes + 1);

        assert!(!store.validate_and_consume("ctx", Some(token.value())).unwrap());
        assert_eq!(session.write_count(), writes + 1);
    }

    #[test]
    fn test_failed_validation_does_not_persist() {
        let session = MemorySession::new();
        let mut store = store(&session);
        store.issue("ctx").unwrap();
        let writes = session.write_count();

        assert!(!store.validate_and_consume("ctx", Some("nope")).unwrap());
        assert!(!store.validate_and_consume("ctx", None).unwrap());
        assert_eq!(session.write_count(), writes);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_expired_token_fails_validation() {
        let mut session = MemorySession::new();
        let future = Utc::now() + Duration::hours(1);
        seed(&mut session, &[HashToken::from_parts("aa11", "", Some(future))]);

        let mut store = store(&session);
        assert_eq!(store.len(), 1);

        store.tokens[0] = HashToken::from_parts("aa11", "", Some(Utc::now() - Duration::seconds(1)));
        assert!(!store.validate_and_consume("", Some("aa11")).unwrap());
    }

    #[test]
    fn test_validation_uses_request_params() {
        let session = MemorySession::new();
        let mut store = store(&session);
        assert!(!store.validate_and_consume("a-context", None).unwrap());

        let token = store.issue("a-context").unwrap();
        store.set_request(RequestParams::new().with_get("csrf_token", token.value()));

        assert!(store.validate_and_consume("a-context", None).unwrap());
        assert!(!store.validate_and_consume("a-context", None).unwrap());
    }

    #[test]
    fn test_explicit_value_overrides_request() {
        let mut store = store(&MemorySession::new());
        let token = store.issue("").unwrap();
        store.set_request(RequestParams::new().with_post("csrf_token", "wrong"));

        assert!(store.validate_and_consume("", Some(token.value())).unwrap());
    }

    #[test]
    fn test_prune_sequence() {
        let session = MemorySession::new();
        let mut store = store(&session);
        for _ in 0..5 {
            store.issue_with("ctx", None, 10).unwrap();
        }
        let newest = store.list_values("ctx", None);

        assert_eq!(store.prune("ctx", 2).unwrap(), 3);
        assert_eq!(store.list_values("ctx", None), newest[..2].to_vec());

        assert_eq!(store.prune("ctx", 1).unwrap(), 1);
        assert_eq!(store.list_values("ctx", None), newest[..1].to_vec());

        assert_eq!(store.prune("ctx", 0).unwrap(), 1);
        assert!(store.list_values("ctx", None).is_empty());

        let writes = session.write_count();
        assert_eq!(store.prune("ctx", 0).unwrap(), 0);
        assert_eq!(store.prune("missing", 3).unwrap(), 0);
        assert_eq!(session.write_count(), writes);
    }

    #[test]
    fn test_prune_negative_keep_deletes_all() {
        for keep in [-1, -2] {
            let mut store = store(&MemorySession::new());
            for _ in 0..3 {
                store.issue_with("ctx", None, 10).unwrap();
            }
            store.issue("other").unwrap();

            assert_eq!(store.prune("ctx", keep).unwrap(), 3);
            assert_eq!(store.len(), 1);
        }
    }

    #[test]
    fn test_prune_leaves_other_contexts() {
        let mut store = store(&MemorySession::new());
        store.issue("a").unwrap();
        store.issue("b").unwrap();
        store.issue("a").unwrap();

        assert_eq!(store.prune("a", 1).unwrap(), 1);
        assert_eq!(store.list_values("b", None).len(), 1);
        assert_eq!(store.list_values("a", None).len(), 1);
    }

    #[test]
    fn test_list_values_newest_first_with_limit() {
        let mut store = store(&MemorySession::new());
        let first = store.issue("").unwrap();
        store.issue("x").unwrap();
        let second = store.issue("").unwrap();
        let third = store.issue("").unwrap();

        assert_eq!(
            store.list_values("", None),
            vec![
                third.value().to_string(),
                second.value().to_string(),
                first.value().to_string()
            ]
        );
        assert_eq!(store.list_values("", Some(2)).len(), 2);
        assert!(store.list_values("", Some(0)).is_empty());
        assert!(store.list_values("nothing", None).is_empty());
    }

    #[test]
    fn test_round_trip_through_session() {
        let session = MemorySession::new();
        let mut first = store(&session);
        first.issue("a").unwrap();
        first.issue_with("b", Some(0), 5).unwrap();

        let second = store(&session);
        assert_eq!(second.tokens(), first.tokens());
    }

    #[test]
    fn test_load_truncates_at_newest_expired() {
        let mut session = MemorySession::new();
        let past = Utc::now() - Duration::minutes(5);
        let future = Utc::now() + Duration::minutes(5);
        seed(
            &mut session,
            &[
                HashToken::from_parts("01", "", None),
                HashToken::from_parts("02", "", Some(past)),
                HashToken::from_parts("03", "", Some(future)),
                HashToken::from_parts("04", "", None),
            ],
        );
        let writes = session.write_count();

        let store = store(&session);
        let values: Vec<&str> = store.tokens().iter().map(HashToken::value).collect();
        assert_eq!(values, vec!["03", "04"]);
        assert_eq!(session.write_count(), writes + 1);

        let reloaded = TokenStore::new(StoreConfig::default(), session.clone()).unwrap();
        assert_eq!(reloaded.tokens(), store.tokens());
    }

    #[test]
    fn test_load_without_expired_does_not_persist() {
        let mut session = MemorySession::new();
        seed(
            &mut session,
            &[
                HashToken::from_parts("01", "", None),
                HashToken::from_parts("02", "f", None),
            ],
        );
        let writes = session.write_count();

        let store = store(&session);
        assert_eq!(store.len(), 2);
        assert_eq!(session.write_count(), writes);
    }

    #[test]
    fn test_corrupt_state_is_treated_as_empty() {
        for raw in [
            "not json",
            r#"{"value": "ab"}"#,
            r#"[{"value": 7, "context": "", "expires_at": null}]"#,
            r#"[{"value": "", "context": "", "expires_at": null}]"#,
        ] {
            let mut session = MemorySession::new();
            session.set(KEY, raw.to_string()).unwrap();

            let store = store(&session);
            assert!(store.is_empty(), "state {raw:?} should be ignored");
            assert_eq!(session.write_count(), 1);
        }
    }

    /// Session whose writes can be switched to fail.
    #[derive(Debug, Clone, Default)]
    struct UnreliableSession {
        inner: MemorySession,
        failing: std::rc::Rc<std::cell::Cell<bool>>,
    }

    impl SessionStorage for UnreliableSession {
        fn get(&self, key: &str) -> formseal_session::SessionResult<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: String) -> formseal_session::SessionResult<()> {
            if self.failing.get() {
                return Err(formseal_session::SessionError::Backend("write refused".to_string()));
            }
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> formseal_session::SessionResult<Option<String>> {
            self.inner.remove(key)
        }
    }

    fn persisted(session: &UnreliableSession) -> Vec<HashToken> {
        serde_json::from_str(&session.inner.get(KEY).unwrap().unwrap()).unwrap()
    }

    #[test]
    fn test_failed_write_leaves_tokens_unchanged() {
        let session = UnreliableSession::default();
        let config = StoreConfig::default().with_max_retained(1);
        let mut store = TokenStore::new(config, session.clone()).unwrap();
        let kept = store.issue("ctx").unwrap();
        store.issue_with("other", None, 5).unwrap();
        let before = store.tokens().to_vec();

        session.failing.set(true);

        assert!(matches!(store.issue("ctx"), Err(CsrfError::Session(_))));
        assert_eq!(store.tokens(), before.as_slice());
        assert_eq!(store.list_values("ctx", None), vec![kept.value().to_string()]);

        assert!(store.validate_and_consume("ctx", Some(kept.value())).is_err());
        assert_eq!(store.tokens(), before.as_slice());

        assert!(store.prune("other", 0).is_err());
        assert_eq!(store.tokens(), before.as_slice());
        assert_eq!(persisted(&session), before);

        session.failing.set(false);
        assert!(store.validate_and_consume("ctx", Some(kept.value())).unwrap());
        assert_eq!(persisted(&session), store.tokens());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = StoreConfig::default().with_hash_size(3);
        assert!(TokenStore::new(config, MemorySession::new()).is_err());
    }
}
