//! Session-backed state: all tracked keys live in one server-brokered blob.

mod cookie_store;
mod store;
mod storer;

pub use cookie_store::CookieSessionStore;
pub use store::{SessionOptions, SessionRecord, SessionStore, SessionStoreError};
pub use storer::{SessionState, SessionStorer};
