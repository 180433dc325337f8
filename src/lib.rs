//! # Client State
//!
//! Cookie and session backed storage for the small key/value facts an
//! authentication flow carries across requests: remember-me tokens, flash
//! messages, pending-auth markers.
//!
//! ## Core Concepts
//!
//! - **Events**: ordered [`StateEvent`] batches (put / delete /
//!   delete-all-with-whitelist) describe every mutation
//! - **Strategies**: [`CookieStorer`] keeps one sealed cookie per key,
//!   [`SessionStorer`] keeps everything in one session blob
//! - **Tolerance**: client-supplied data that fails verification reads as
//!   absent instead of failing the request
//!
//! ## Example
//!
//! ```ignore
//! use client_state::{ClientStateReadWriter, CookieStorer, StateEvent};
//!
//! let storer = CookieStorer::new(signing_key);
//!
//! // Start of request: reconstruct state from the incoming cookies
//! let state = storer.read_state(request.headers())?;
//! let remembered = state.get("rm");
//!
//! // End of request: reconcile the accumulated events onto the response
//! storer.write_state(
//!     response.headers_mut(),
//!     state,
//!     &[StateEvent::put("rm", token)],
//! )?;
//! ```

pub mod cookies;
pub mod error;
pub mod seal;
pub mod sessions;
pub mod types;

// Re-exports
pub use cookie::SameSite;
pub use cookies::{CookieState, CookieStorer};
pub use error::{ClientStateError, Result};
pub use seal::{KeySealer, SealError, Sealer, UnsealError};
pub use sessions::{
    CookieSessionStore, SessionOptions, SessionRecord, SessionState, SessionStore,
    SessionStoreError, SessionStorer,
};
pub use types::*;
