//! Default session backend: the whole record sealed into one cookie.

use super::store::{SessionOptions, SessionRecord, SessionStore, SessionStoreError};
use crate::seal::{KeySealer, Sealer, UnsealError};
use cookie::Cookie;
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use time::{Duration, OffsetDateTime};

/// What actually travels inside the sealed cookie value.
#[derive(Serialize, Deserialize)]
struct SessionPayload {
    /// Unix seconds after which the record is dead. Zero means no embedded
    /// expiry (browser-session cookie).
    expires_at: i64,

    values: HashMap<String, Value>,
}

/// A [`SessionStore`] that persists each record as one sealed JSON blob in a
/// cookie named after the session. No server-side storage: the client
/// carries the whole record, the seal keeps it tamper-evident.
pub struct CookieSessionStore<S = KeySealer> {
    sealer: S,

    /// Options handed to every record this store creates.
    pub options: SessionOptions,
}

impl CookieSessionStore<KeySealer> {
    /// Create a store sealing with the built-in [`KeySealer`] under `key`.
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        // Record expiry lives in the payload, so the sealer's own age check
        // is disabled rather than second-guessing it.
        Self::with_sealer(KeySealer::new(key).with_max_age(0))
    }
}

impl<S: Sealer> CookieSessionStore<S> {
    /// Create a store around an externally-owned sealer.
    pub fn with_sealer(sealer: S) -> Self {
        Self {
            sealer,
            options: SessionOptions::default(),
        }
    }
}

/// Find the raw value of the request cookie called `name`, if any.
fn request_cookie(request: &HeaderMap, name: &str) -> Option<String> {
    for header in request.get_all(COOKIE) {
        let Ok(raw) = header.to_str() else { continue };
        for cookie in Cookie::split_parse(raw) {
            let Ok(cookie) = cookie else { continue };
            if cookie.name() == name {
                return Some(cookie.value().to_owned());
            }
        }
    }
    None
}

fn append_set_cookie(response: &mut HeaderMap, cookie: Cookie<'_>) -> Result<(), SessionStoreError> {
    let value = HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| SessionStoreError::Backend(format!("invalid session cookie: {e}")))?;
    response.append(SET_COOKIE, value);
    Ok(())
}

impl<S: Sealer> SessionStore for CookieSessionStore<S> {
    fn get(&self, request: &HeaderMap, name: &str) -> Result<SessionRecord, SessionStoreError> {
        let Some(sealed) = request_cookie(request, name) else {
            return Ok(SessionRecord::new(name, self.options.clone()));
        };

        let plain = self.sealer.unseal(name, &sealed).map_err(|e| match e {
            UnsealError::Decode(msg) => SessionStoreError::Decode(msg),
            UnsealError::Internal(msg) => SessionStoreError::Backend(msg),
        })?;

        let payload: SessionPayload =
            serde_json::from_str(&plain).map_err(|e| SessionStoreError::Decode(e.to_string()))?;

        if payload.expires_at > 0
            && OffsetDateTime::now_utc().unix_timestamp() >= payload.expires_at
        {
            return Err(SessionStoreError::Decode("session expired".into()));
        }

        Ok(SessionRecord {
            name: name.to_owned(),
            values: payload.values,
            options: self.options.clone(),
            is_new: false,
        })
    }

    fn create(&self, _request: &HeaderMap, name: &str) -> Result<SessionRecord, SessionStoreError> {
        Ok(SessionRecord::new(name, self.options.clone()))
    }

    fn save(
        &self,
        response: &mut HeaderMap,
        record: SessionRecord,
    ) -> Result<(), SessionStoreError> {
        let options = &record.options;

        if record.is_marked_for_deletion() {
            let mut builder = Cookie::build((record.name.clone(), ""))
                .path(options.path.clone())
                .max_age(Duration::ZERO)
                .expires(OffsetDateTime::UNIX_EPOCH);
            if !options.domain.is_empty() {
                builder = builder.domain(options.domain.clone());
            }
            return append_set_cookie(response, builder.build());
        }

        let now = OffsetDateTime::now_utc();
        let expires_at = if options.max_age > 0 {
            now.unix_timestamp() + options.max_age
        } else {
            0
        };

        let payload = SessionPayload {
            expires_at,
            values: record.values,
        };
        let json = serde_json::to_string(&payload)
            .map_err(|e| SessionStoreError::Backend(e.to_string()))?;
        let sealed = self
            .sealer
            .seal(&record.name, &json)
            .map_err(|e| SessionStoreError::Backend(e.to_string()))?;

        let mut builder = Cookie::build((record.name.clone(), sealed))
            .path(options.path.clone())
            .http_only(options.http_only)
            .secure(options.secure);
        if !options.domain.is_empty() {
            builder = builder.domain(options.domain.clone());
        }
        if options.max_age > 0 {
            builder = builder
                .max_age(Duration::seconds(options.max_age))
                .expires(now + Duration::seconds(options.max_age));
        }

        append_set_cookie(response, builder.build())
    }
}
