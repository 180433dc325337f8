//! Session strategy tests: round-trip, degradation, whitelist, commit point.

use client_state::{
    ClientStateError, ClientStateReadWriter, CookieState, SessionState, SessionStorer, StateEvent,
};
use cookie::Cookie;
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};
use std::collections::HashMap;
use std::time::Duration;

const KEY: [u8; 32] = *b"0123456789abcdef0123456789abcdef";

fn storer() -> SessionStorer {
    SessionStorer::new("sid", KEY)
}

/// Surface the tolerance-policy debug logs when running with
/// `--nocapture`.
fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Echo the response's cookies back as a request, honoring removals.
fn echo_cookies(response: &HeaderMap) -> HeaderMap {
    let mut request = HeaderMap::new();
    for header in response.get_all(SET_COOKIE) {
        let cookie = Cookie::parse(header.to_str().unwrap().to_owned()).unwrap();
        let expired = cookie
            .max_age()
            .map(|age| age <= time::Duration::ZERO)
            .unwrap_or(false);
        if expired {
            request.remove(COOKIE);
            continue;
        }
        let pair = format!("{}={}", cookie.name(), cookie.value());
        request.insert(COOKIE, HeaderValue::from_str(&pair).unwrap());
    }
    request
}

/// Write one event batch against a fresh read of `request`.
fn write_batch(storer: &SessionStorer, request: &HeaderMap, events: &[StateEvent]) -> HeaderMap {
    let state = storer.read_state(request).unwrap();
    let mut response = HeaderMap::new();
    storer.write_state(&mut response, state, events).unwrap();
    response
}

// --- Round-trip ---

#[test]
fn test_roundtrip() {
    let storer = storer();

    let response = write_batch(
        &storer,
        &HeaderMap::new(),
        &[StateEvent::put("hello", "World")],
    );
    assert!(response.get(SET_COOKIE).is_some(), "it should have set a cookie");

    let request = echo_cookies(&response);
    let state = storer.read_state(&request).unwrap();
    assert_eq!(state.get("hello"), Some("World"));
}

// --- Expiry ---

#[test]
fn test_expiry() {
    let mut storer = storer();
    storer.store_mut().options.max_age = 1;

    let response = write_batch(
        &storer,
        &HeaderMap::new(),
        &[StateEvent::put("hello", "World")],
    );

    std::thread::sleep(Duration::from_secs(2));

    let request = echo_cookies(&response);
    let state = storer.read_state(&request).unwrap();
    assert_eq!(state.get("hello"), None);
}

// --- Tamper tolerance ---

#[test]
fn test_corrupt_session_degrades_to_fresh() {
    init_logging();
    let storer = storer();

    let mut request = HeaderMap::new();
    request.insert(COOKIE, HeaderValue::from_static("sid=tampered-garbage"));

    // Read must not error; it degrades to a fresh empty session
    let state = storer.read_state(&request).unwrap();
    assert_eq!(state.get("hello"), None);
    let session = state.as_any().downcast_ref::<SessionState>().unwrap();
    assert!(session.record().is_new);

    // And the next write self-heals
    let mut response = HeaderMap::new();
    storer
        .write_state(&mut response, state, &[StateEvent::put("hello", "World")])
        .unwrap();
    let request = echo_cookies(&response);
    let state = storer.read_state(&request).unwrap();
    assert_eq!(state.get("hello"), Some("World"));
}

// --- Deletion ---

#[test]
fn test_put_then_delete() {
    let storer = storer();

    let response = write_batch(&storer, &HeaderMap::new(), &[StateEvent::put("k", "v")]);
    let request = echo_cookies(&response);

    let response = write_batch(&storer, &request, &[StateEvent::del("k")]);
    let request = echo_cookies(&response);

    let state = storer.read_state(&request).unwrap();
    assert_eq!(state.get("k"), None);
}

#[test]
fn test_delete_absent_key_preserves_siblings() {
    let storer = storer();

    let response = write_batch(&storer, &HeaderMap::new(), &[StateEvent::put("a", "1")]);
    let request = echo_cookies(&response);

    let response = write_batch(&storer, &request, &[StateEvent::del("missing")]);
    let request = echo_cookies(&response);

    let state = storer.read_state(&request).unwrap();
    assert_eq!(state.get("a"), Some("1"));
}

#[test]
fn test_del_all_terminates_session() {
    let storer = storer();

    let response = write_batch(
        &storer,
        &HeaderMap::new(),
        &[StateEvent::put("a", "1"), StateEvent::put("b", "2")],
    );
    let request = echo_cookies(&response);

    let response = write_batch(&storer, &request, &[StateEvent::DelAll]);
    let header = response.get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(header.contains("Max-Age=0"), "got: {header}");

    let request = echo_cookies(&response);
    let state = storer.read_state(&request).unwrap();
    assert_eq!(state.get("a"), None);
    assert_eq!(state.get("b"), None);
}

#[test]
fn test_del_all_whitelist() {
    let storer = storer();

    let response = write_batch(
        &storer,
        &HeaderMap::new(),
        &[
            StateEvent::put("a", "1"),
            StateEvent::put("b", "2"),
            StateEvent::put("c", "3"),
        ],
    );
    let request = echo_cookies(&response);

    let response = write_batch(
        &storer,
        &request,
        &[StateEvent::del_all_whitelist("a,c")],
    );
    let request = echo_cookies(&response);

    let state = storer.read_state(&request).unwrap();
    assert_eq!(state.get("a"), Some("1"));
    assert_eq!(state.get("b"), None);
    assert_eq!(state.get("c"), Some("3"));
}

// --- Event ordering ---

#[test]
fn test_same_call_ordering_last_write_wins() {
    let storer = storer();

    let response = write_batch(
        &storer,
        &HeaderMap::new(),
        &[
            StateEvent::put("k", "1"),
            StateEvent::del("k"),
            StateEvent::put("k", "2"),
        ],
    );
    let request = echo_cookies(&response);

    let state = storer.read_state(&request).unwrap();
    assert_eq!(state.get("k"), Some("2"));
}

// --- Programmer errors ---

#[test]
fn test_wrong_state_shape_fails_loudly() {
    let storer = storer();

    let foreign = Box::new(CookieState::from(HashMap::new()));
    let mut response = HeaderMap::new();
    let result = storer.write_state(&mut response, foreign, &[StateEvent::put("k", "v")]);

    assert!(matches!(
        result,
        Err(ClientStateError::StateMismatch { .. })
    ));
    // Nothing committed
    assert!(response.get(SET_COOKIE).is_none());
}
