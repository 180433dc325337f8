//! The session backend contract.

use crate::types::DEFAULT_SESSION_MAX_AGE;
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Error from a session backend.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    /// The stored blob is tampered with, stale, or otherwise undecodable.
    /// [`SessionStorer`](crate::SessionStorer) degrades this to a fresh
    /// session instead of failing the request.
    #[error("session data failed verification: {0}")]
    Decode(String),

    /// Backend unavailability or any other failure. Propagated verbatim.
    #[error("session backend error: {0}")]
    Backend(String),
}

impl SessionStoreError {
    /// Whether this failure came from decoding stored session data.
    pub fn is_decode(&self) -> bool {
        matches!(self, SessionStoreError::Decode(_))
    }
}

/// Cookie/expiry options carried by a session record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Lifetime in seconds. Zero means a browser-session cookie; negative
    /// means delete immediately.
    pub max_age: i64,

    /// Defaults to `/`.
    pub path: String,

    /// Defaults empty (browser default).
    pub domain: String,

    /// Defaults to true.
    pub http_only: bool,

    /// Defaults to true.
    pub secure: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_SESSION_MAX_AGE,
            path: "/".to_owned(),
            domain: String::new(),
            http_only: true,
            secure: true,
        }
    }
}

/// A live session blob: an owned handle over the backend's mapping for one
/// request. Mutations only become visible to the client once the record is
/// passed back through [`SessionStore::save`].
///
/// Values are `serde_json::Value` because backends are not contractually
/// typed, but this layer only ever writes strings.
#[derive(Clone, Debug)]
pub struct SessionRecord {
    /// The store entry this record belongs to.
    pub name: String,

    /// The session's key/value mapping.
    pub values: HashMap<String, Value>,

    /// Expiry and cookie attributes applied at save time.
    pub options: SessionOptions,

    /// Whether this record was freshly created rather than loaded.
    pub is_new: bool,
}

impl SessionRecord {
    /// Create a fresh empty record.
    pub fn new(name: impl Into<String>, options: SessionOptions) -> Self {
        Self {
            name: name.into(),
            values: HashMap::new(),
            options,
            is_new: true,
        }
    }

    /// Flag the whole session for immediate deletion at save time.
    pub fn mark_for_deletion(&mut self) {
        self.options.max_age = -1;
    }

    pub fn is_marked_for_deletion(&self) -> bool {
        self.options.max_age < 0
    }
}

/// Keyed persistence for session records.
///
/// Implementations own the record lifecycle and any cross-request
/// consistency; this layer performs one `get` (or `create`) per read and
/// exactly one `save` per write.
pub trait SessionStore {
    /// Load the record named `name` carried by the request, or a fresh one
    /// if the request carries none. A record that exists but fails
    /// verification is a [`SessionStoreError::Decode`].
    fn get(&self, request: &HeaderMap, name: &str) -> Result<SessionRecord, SessionStoreError>;

    /// Create a fresh empty record for `name`, ignoring whatever the
    /// request carries.
    fn create(&self, request: &HeaderMap, name: &str) -> Result<SessionRecord, SessionStoreError>;

    /// Persist the record and emit the client-visible result onto the
    /// response. The sole commit point for session writes.
    fn save(&self, response: &mut HeaderMap, record: SessionRecord)
        -> Result<(), SessionStoreError>;
}
