//! Error types for the client-state layer.

use crate::seal::{SealError, UnsealError};
use crate::sessions::SessionStoreError;
use thiserror::Error;

/// Main error type for state read/write operations.
///
/// Decode failures on client-supplied data never appear here: a cookie that
/// fails verification is skipped during read, and a session blob that fails
/// verification degrades to a fresh session. Everything below is fatal for
/// the call that produced it.
#[derive(Debug, Error)]
pub enum ClientStateError {
    #[error("failed to seal value for cookie {name}")]
    Seal {
        name: String,
        #[source]
        source: SealError,
    },

    #[error("failed to read sealed cookie")]
    Unseal(#[source] UnsealError),

    #[error(transparent)]
    Session(#[from] SessionStoreError),

    #[error("client state shape mismatch: expected {expected} state")]
    StateMismatch { expected: &'static str },

    #[error("cookie does not serialize to a valid header: {0}")]
    InvalidCookie(String),
}

/// Result type for state operations.
pub type Result<T> = std::result::Result<T, ClientStateError>;
