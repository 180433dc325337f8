//! Core types for the client-state layer.

use crate::error::Result;
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Default cookie name for the remember-me token. This is the single key the
/// cookie strategy tracks when no explicit list is configured.
pub const REMEMBER_COOKIE: &str = "rm";

/// Default cookie `Max-Age` in seconds (one month).
pub const DEFAULT_COOKIE_MAX_AGE: i64 = 2_628_000;

/// Default session lifetime in seconds (12 hours). Set to something finite
/// because otherwise sessions may never expire as long as the browser stays
/// open.
pub const DEFAULT_SESSION_MAX_AGE: i64 = 43_200;

/// One instruction to mutate the persisted client state.
///
/// Events are applied in the order supplied and never deduplicated: a `Put`
/// after a `Del` on the same key re-materializes the key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateEvent {
    /// Set `key` to `value`, overwriting any previous value.
    Put { key: String, value: String },

    /// Remove `key`. Removing an absent key is a no-op.
    Del { key: String },

    /// Wipe the entire state container (bulk termination, e.g. logout).
    DelAll,

    /// Remove every key except the listed ones, which keep their values.
    DelAllExcept { keep: Vec<String> },
}

impl StateEvent {
    pub fn put(key: impl Into<String>, value: impl Into<String>) -> Self {
        StateEvent::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn del(key: impl Into<String>) -> Self {
        StateEvent::Del { key: key.into() }
    }

    /// Build a delete-all event from the comma-separated whitelist form used
    /// by callers that carry the keep-list as a single string. An empty
    /// string means "delete everything".
    pub fn del_all_whitelist(keep: &str) -> Self {
        if keep.is_empty() {
            StateEvent::DelAll
        } else {
            StateEvent::DelAllExcept {
                keep: keep.split(',').map(str::to_owned).collect(),
            }
        }
    }
}

/// Read view of the key/value state carried by one request.
///
/// A state answers `get` with `Some(value)` iff the key was present and
/// successfully decoded at read time; absent or corrupt entries answer
/// `None`. States are request-scoped: created by
/// [`ClientStateReadWriter::read_state`], consumed by
/// [`ClientStateReadWriter::write_state`], never reused across requests.
pub trait ClientState: Any {
    /// Get a key's value.
    fn get(&self, key: &str) -> Option<&str>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// A storage strategy for client state.
///
/// The two provided implementations map state onto independent sealed
/// cookies ([`CookieStorer`](crate::CookieStorer)) or a single session blob
/// ([`SessionStorer`](crate::SessionStorer)). Application code depends only
/// on this capability, never on a concrete strategy.
pub trait ClientStateReadWriter {
    /// Reconstruct the state carried by the request headers.
    fn read_state(&self, request: &HeaderMap) -> Result<Box<dyn ClientState>>;

    /// Apply the ordered event batch against `state` and emit the result
    /// onto the response headers.
    ///
    /// `state` must be the value returned by this strategy's `read_state`
    /// for the same request; passing another strategy's state fails with
    /// [`ClientStateError::StateMismatch`](crate::ClientStateError::StateMismatch).
    fn write_state(
        &self,
        response: &mut HeaderMap,
        state: Box<dyn ClientState>,
        events: &[StateEvent],
    ) -> Result<()>;
}
