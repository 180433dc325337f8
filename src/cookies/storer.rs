//! Per-key sealed cookie storage.

use crate::error::{ClientStateError, Result};
use crate::seal::{KeySealer, Sealer};
use crate::types::{
    ClientState, ClientStateReadWriter, StateEvent, DEFAULT_COOKIE_MAX_AGE, REMEMBER_COOKIE,
};
use cookie::{Cookie, SameSite};
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};
use std::any::Any;
use std::collections::HashMap;
use time::{Duration, OffsetDateTime};
use tracing::debug;

/// State reconstructed from the request's sealed cookies. Holds only the
/// tracked keys that decoded successfully.
#[derive(Clone, Debug, Default)]
pub struct CookieState(HashMap<String, String>);

impl From<HashMap<String, String>> for CookieState {
    fn from(values: HashMap<String, String>) -> Self {
        CookieState(values)
    }
}

impl ClientState for CookieState {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Reads and writes client state as independent sealed cookies.
///
/// Holds no state across requests: everything is reconstructed from the
/// incoming `Cookie` headers on every read. Configuration fields are public
/// and take effect on the next write.
pub struct CookieStorer<S = KeySealer> {
    sealer: S,

    /// Cookie names this storer will read and write.
    pub cookies: Vec<String>,

    /// Defaults empty (browser default).
    pub domain: String,

    /// Defaults to `/`.
    pub path: String,

    /// `Max-Age` in seconds. Defaults to 1 month.
    pub max_age: i64,

    /// Defaults to true.
    pub http_only: bool,

    /// Defaults to true.
    pub secure: bool,

    /// Defaults to `None` ("off").
    pub same_site: Option<SameSite>,
}

impl CookieStorer<KeySealer> {
    /// Create a storer sealing with the built-in [`KeySealer`] under `key`,
    /// tracking only the remember-me cookie.
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self::with_sealer(KeySealer::new(key))
    }
}

impl<S: Sealer> CookieStorer<S> {
    /// Create a storer around an externally-owned sealer.
    pub fn with_sealer(sealer: S) -> Self {
        Self {
            sealer,
            cookies: vec![REMEMBER_COOKIE.to_owned()],
            domain: String::new(),
            path: "/".to_owned(),
            max_age: DEFAULT_COOKIE_MAX_AGE,
            http_only: true,
            secure: true,
            same_site: None,
        }
    }

    fn is_tracked(&self, name: &str) -> bool {
        self.cookies.iter().any(|n| n == name)
    }

    fn put_cookie(&self, key: &str, sealed: String) -> Cookie<'static> {
        let mut builder = Cookie::build((key.to_owned(), sealed))
            .path(self.path.clone())
            .max_age(Duration::seconds(self.max_age))
            // Expires is a generous upper bound; Max-Age is the precise
            // control for compliant clients.
            .expires(OffsetDateTime::now_utc() + Duration::days(365))
            .http_only(self.http_only)
            .secure(self.secure);
        if !self.domain.is_empty() {
            builder = builder.domain(self.domain.clone());
        }
        if let Some(same_site) = self.same_site {
            builder = builder.same_site(same_site);
        }
        builder.build()
    }

    fn removal_cookie(&self, key: &str) -> Cookie<'static> {
        let mut builder = Cookie::build((key.to_owned(), ""))
            .path(self.path.clone())
            .max_age(Duration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH);
        if !self.domain.is_empty() {
            builder = builder.domain(self.domain.clone());
        }
        builder.build()
    }
}

fn append_set_cookie(response: &mut HeaderMap, cookie: Cookie<'_>) -> Result<()> {
    let value = HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| ClientStateError::InvalidCookie(e.to_string()))?;
    response.append(SET_COOKIE, value);
    Ok(())
}

impl<S: Sealer> ClientStateReadWriter for CookieStorer<S> {
    fn read_state(&self, request: &HeaderMap) -> Result<Box<dyn ClientState>> {
        let mut state = HashMap::new();

        for header in request.get_all(COOKIE) {
            let Ok(raw) = header.to_str() else {
                debug!("skipping cookie header with non-visible-ASCII bytes");
                continue;
            };

            for cookie in Cookie::split_parse(raw) {
                // Unparseable pairs are client garbage, same as a cookie
                // that fails verification below.
                let Ok(cookie) = cookie else { continue };
                if !self.is_tracked(cookie.name()) {
                    continue;
                }

                match self.sealer.unseal(cookie.name(), cookie.value()) {
                    Ok(value) => {
                        state.insert(cookie.name().to_owned(), value);
                    }
                    Err(err) if err.is_decode() => {
                        // The client may carry a bad cookie for a long time,
                        // but it gets overwritten by the next write.
                        debug!(cookie = cookie.name(), %err, "skipping cookie that failed verification");
                    }
                    Err(err) => return Err(ClientStateError::Unseal(err)),
                }
            }
        }

        Ok(Box::new(CookieState(state)))
    }

    /// Apply `events` by emitting one `Set-Cookie` per `Put`/`Del`.
    ///
    /// `DelAll`/`DelAllExcept` are no-ops here: there is no single container
    /// to wipe, and per-key cookies are only removed by explicit `Del`
    /// events. A sealing failure aborts the batch; `Set-Cookie` headers
    /// already appended by earlier events stay on the response (best-effort,
    /// no batch rollback).
    fn write_state(
        &self,
        response: &mut HeaderMap,
        state: Box<dyn ClientState>,
        events: &[StateEvent],
    ) -> Result<()> {
        // Each cookie is written from the event alone, but the snapshot
        // still has to be this strategy's own shape.
        let _state = state
            .into_any()
            .downcast::<CookieState>()
            .map_err(|_| ClientStateError::StateMismatch { expected: "cookie" })?;

        for event in events {
            match event {
                StateEvent::Put { key, value } => {
                    let sealed =
                        self.sealer
                            .seal(key, value)
                            .map_err(|source| ClientStateError::Seal {
                                name: key.clone(),
                                source,
                            })?;
                    append_set_cookie(response, self.put_cookie(key, sealed))?;
                }
                StateEvent::Del { key } => {
                    append_set_cookie(response, self.removal_cookie(key))?;
                }
                StateEvent::DelAll | StateEvent::DelAllExcept { .. } => {
                    debug!("delete-all ignored by the cookie strategy");
                }
            }
        }

        Ok(())
    }
}
