//! Single-blob session storage.

use super::cookie_store::CookieSessionStore;
use super::store::{SessionRecord, SessionStore};
use crate::error::{ClientStateError, Result};
use crate::types::{ClientState, ClientStateReadWriter, StateEvent};
use http::HeaderMap;
use serde_json::Value;
use std::any::Any;
use tracing::debug;

/// State wrapping the live session record for one request.
///
/// This is an owning handle: mutations applied during `write_state` touch
/// the record directly and are committed by a single
/// [`SessionStore::save`]. The handle is tied to the request/response pair
/// it was read from and must not be reused.
pub struct SessionState {
    record: SessionRecord,
}

impl SessionState {
    /// The underlying record.
    pub fn record(&self) -> &SessionRecord {
        &self.record
    }
}

impl ClientState for SessionState {
    fn get(&self, key: &str) -> Option<&str> {
        // This layer only writes strings; a foreign non-string value reads
        // as absent.
        self.record.values.get(key).and_then(Value::as_str)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Reads and writes client state as one named session blob.
pub struct SessionStorer<T = CookieSessionStore> {
    /// Name of the blob entry on the backend (and of the client-side
    /// session cookie for cookie-backed stores).
    pub name: String,

    store: T,
}

impl SessionStorer<CookieSessionStore> {
    /// Create a storer backed by the default [`CookieSessionStore`] sealing
    /// under `key`.
    pub fn new(name: impl Into<String>, key: impl Into<Vec<u8>>) -> Self {
        Self::from_store(name, CookieSessionStore::new(key))
    }
}

impl<T: SessionStore> SessionStorer<T> {
    /// Create a storer over an already-configured backend.
    pub fn from_store(name: impl Into<String>, store: T) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    /// Backend access, e.g. to adjust a cookie store's options.
    pub fn store_mut(&mut self) -> &mut T {
        &mut self.store
    }
}

/// Apply the event batch to the record's mapping, in order.
fn apply_events(record: &mut SessionRecord, events: &[StateEvent]) {
    for event in events {
        match event {
            StateEvent::Put { key, value } => {
                record
                    .values
                    .insert(key.clone(), Value::String(value.clone()));
            }
            StateEvent::Del { key } => {
                record.values.remove(key);
            }
            StateEvent::DelAll => {
                // Bulk termination: kill the whole blob rather than
                // clearing entries one by one.
                record.mark_for_deletion();
            }
            StateEvent::DelAllExcept { keep } => {
                record.values.retain(|key, _| keep.iter().any(|k| k == key));
            }
        }
    }
}

impl<T: SessionStore> ClientStateReadWriter for SessionStorer<T> {
    fn read_state(&self, request: &HeaderMap) -> Result<Box<dyn ClientState>> {
        let record = match self.store.get(request, &self.name) {
            Ok(record) => record,
            Err(err) if err.is_decode() => {
                // Corrupt session data degrades to "no session"; the next
                // write replaces it.
                debug!(session = %self.name, %err, "session failed verification, starting fresh");
                self.store.create(request, &self.name)?
            }
            Err(err) => return Err(err.into()),
        };

        Ok(Box::new(SessionState { record }))
    }

    fn write_state(
        &self,
        response: &mut HeaderMap,
        state: Box<dyn ClientState>,
        events: &[StateEvent],
    ) -> Result<()> {
        let state = state
            .into_any()
            .downcast::<SessionState>()
            .map_err(|_| ClientStateError::StateMismatch { expected: "session" })?;

        let mut record = state.record;
        apply_events(&mut record, events);

        self.store.save(response, record).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::SessionOptions;

    fn record() -> SessionRecord {
        SessionRecord::new("sid", SessionOptions::default())
    }

    fn put(key: &str, value: &str) -> StateEvent {
        StateEvent::put(key, value)
    }

    #[test]
    fn test_put_overwrites() {
        let mut r = record();
        apply_events(&mut r, &[put("k", "1"), put("k", "2")]);
        assert_eq!(r.values["k"], Value::String("2".into()));
    }

    #[test]
    fn test_del_absent_is_noop() {
        let mut r = record();
        apply_events(&mut r, &[put("a", "1"), StateEvent::del("missing")]);
        assert_eq!(r.values.len(), 1);
        assert_eq!(r.values["a"], Value::String("1".into()));
    }

    #[test]
    fn test_put_after_del_rematerializes() {
        let mut r = record();
        apply_events(
            &mut r,
            &[put("k", "1"), StateEvent::del("k"), put("k", "2")],
        );
        assert_eq!(r.values["k"], Value::String("2".into()));
    }

    #[test]
    fn test_del_all_marks_record() {
        let mut r = record();
        apply_events(&mut r, &[put("k", "1"), StateEvent::DelAll]);
        assert!(r.is_marked_for_deletion());
    }

    #[test]
    fn test_del_all_except_keeps_whitelist() {
        let mut r = record();
        apply_events(
            &mut r,
            &[
                put("a", "1"),
                put("b", "2"),
                put("c", "3"),
                StateEvent::del_all_whitelist("a,c"),
            ],
        );
        assert_eq!(r.values.len(), 2);
        assert_eq!(r.values["a"], Value::String("1".into()));
        assert_eq!(r.values["c"], Value::String("3".into()));
        assert!(!r.is_marked_for_deletion());
    }

    #[test]
    fn test_del_all_except_empty_clears_without_terminating() {
        let mut r = record();
        apply_events(
            &mut r,
            &[put("a", "1"), StateEvent::DelAllExcept { keep: vec![] }],
        );
        assert!(r.values.is_empty());
        assert!(!r.is_marked_for_deletion());
    }

    #[test]
    fn test_non_string_value_reads_as_absent() {
        let mut r = record();
        r.values.insert("n".to_owned(), Value::from(42));
        let state = SessionState { record: r };
        assert_eq!(state.get("n"), None);
    }
}
