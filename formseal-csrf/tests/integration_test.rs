//! Integration tests for formseal-csrf

use formseal_csrf::*;
use formseal_session::{MemorySession, Session};

fn new_store(session: &MemorySession) -> TokenStore<MemorySession> {
    TokenStore::new(StoreConfig::default(), session.clone()).unwrap()
}

#[test]
fn test_five_issues_then_prune_two() {
    let session = MemorySession::new();
    let mut store = new_store(&session);

    let issued: Vec<String> = (0..5)
        .map(|_| store.issue("").unwrap().value().to_string())
        .collect();
    let unique: std::collections::HashSet<&String> = issued.iter().collect();
    assert_eq!(unique.len(), 5);

    assert_eq!(store.prune("", 2).unwrap(), 3);

    let remaining = store.list_values("", None);
    assert_eq!(remaining.len(), 2);
    assert!(remaining.contains(&issued[3]));
    assert!(remaining.contains(&issued[4]));
    for old in &issued[..3] {
        assert!(!remaining.contains(old));
    }
}

#[test]
fn test_get_parameter_validation_across_requests() {
    let session = MemorySession::new();

    let mut first = new_store(&session);
    assert!(!first.validate_and_consume("a-context", None).unwrap());
    let token = first.issue("a-context").unwrap();

    let request = RequestParams::new()
        .with_query(&format!("csrf_token={}", token.value()))
        .unwrap();
    let mut second = new_store(&session).with_request(request.clone());
    assert!(second.validate_and_consume("a-context", None).unwrap());
    assert!(!second.validate_and_consume("a-context", None).unwrap());

    // A replay in a fresh request sees the consumed state.
    let mut third = new_store(&session).with_request(request);
    assert!(!third.validate_and_consume("a-context", None).unwrap());
}

#[test]
fn test_retention_across_requests() {
    let session = MemorySession::new();
    let config = StoreConfig::default().with_max_retained(2);

    let mut values = Vec::new();
    for _ in 0..4 {
        let mut store = TokenStore::new(config.clone(), session.clone()).unwrap();
        values.push(store.issue("comment").unwrap().value().to_string());
    }

    let store = TokenStore::new(config, session).unwrap();
    assert_eq!(
        store.list_values("comment", None),
        vec![values[3].clone(), values[2].clone()]
    );
}

#[test]
fn test_contexts_are_isolated() {
    let mut store = new_store(&MemorySession::new());
    let login = store.issue("login").unwrap();
    let logout = store.issue("logout").unwrap();

    assert!(!store.validate_and_consume("logout", Some(login.value())).unwrap());
    assert!(store.validate_and_consume("login", Some(login.value())).unwrap());
    assert!(store.validate_and_consume("logout", Some(logout.value())).unwrap());
}

#[test]
fn test_session_record_backend() {
    let mut record = Session::generate();
    let value = {
        let mut store = TokenStore::new(StoreConfig::default(), &mut record).unwrap();
        store.issue("").unwrap().value().to_string()
    };

    // The application saves and reloads its session record between requests.
    let mut restored = Session::from_json(&record.to_json().unwrap()).unwrap();
    let mut store = TokenStore::new(StoreConfig::default(), &mut restored).unwrap();
    assert!(store.validate_and_consume("", Some(&value)).unwrap());
    drop(store);

    assert_eq!(restored.data.get("csrf_tokens").map(String::as_str), Some("[]"));
}

#[test]
fn test_custom_session_key() {
    let session = MemorySession::new();
    let config = StoreConfig::new("admin_csrf");
    let mut store = TokenStore::new(config, session.clone()).unwrap();
    store.issue("").unwrap();

    let snapshot = session.snapshot().unwrap();
    assert!(snapshot.contains_key("admin_csrf"));
    assert!(!snapshot.contains_key("csrf_tokens"));
}

#[test]
fn test_invalid_hash_size_is_an_error() {
    let config = StoreConfig::default().with_hash_size(0);
    let result = TokenStore::new(config, MemorySession::new());
    assert!(matches!(result, Err(CsrfError::InvalidHashSize(0))));
}
