//! Cookie-backed state: every tracked key maps to its own sealed cookie.

mod storer;

pub use storer::{CookieState, CookieStorer};
