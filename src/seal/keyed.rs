//! HMAC-signed token sealer.

use super::{SealError, Sealer, UnsealError};
use crate::types::DEFAULT_COOKIE_MAX_AGE;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use time::OffsetDateTime;

type HmacSha256 = Hmac<Sha256>;

/// Default maximum token age in seconds. Matches the default cookie
/// `Max-Age` so a cookie written with defaults never outlives its own
/// token.
const DEFAULT_TOKEN_MAX_AGE: i64 = DEFAULT_COOKIE_MAX_AGE;

/// Signs values with HMAC-SHA256 into `payload.timestamp.tag` tokens, with
/// payload and tag base64url-encoded so the result is cookie-safe.
///
/// The token embeds its creation time and is rejected as a decode failure
/// once older than the configured max age. Key rotation is supported: the
/// first key signs, every key verifies, so tokens sealed under a rotated-out
/// key keep working while that key remains in the set.
///
/// Sign-only. Values are visible to the client, just not forgeable; if the
/// value itself is sensitive, provide a [`Sealer`] that also encrypts.
#[derive(Clone)]
pub struct KeySealer {
    keys: Vec<Vec<u8>>,
    max_age: i64,
}

impl KeySealer {
    /// Create a sealer signing with `key`. Keys should be 32 or 64 random
    /// bytes.
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self {
            keys: vec![key.into()],
            max_age: DEFAULT_TOKEN_MAX_AGE,
        }
    }

    /// Add keys that no longer sign but still verify, oldest last.
    pub fn with_fallback_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Vec<u8>>,
    {
        self.keys.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Override the maximum accepted token age in seconds. Zero or negative
    /// disables the age check.
    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = seconds;
        self
    }

    fn tag(key: &[u8], name: &str, payload: &str, timestamp: i64) -> Result<HmacSha256, SealError> {
        let mut mac = HmacSha256::new_from_slice(key)
            .map_err(|e| SealError(format!("invalid signing key: {e}")))?;
        mac.update(name.as_bytes());
        mac.update(b":");
        mac.update(payload.as_bytes());
        mac.update(b":");
        mac.update(timestamp.to_string().as_bytes());
        Ok(mac)
    }

    fn seal_at(&self, name: &str, value: &str, now: i64) -> Result<String, SealError> {
        let key = self
            .keys
            .first()
            .ok_or_else(|| SealError("no signing key configured".into()))?;

        let payload = URL_SAFE_NO_PAD.encode(value.as_bytes());
        let tag = Self::tag(key, name, &payload, now)?.finalize().into_bytes();
        Ok(format!("{payload}.{now}.{}", URL_SAFE_NO_PAD.encode(tag)))
    }

    fn unseal_at(&self, name: &str, sealed: &str, now: i64) -> Result<String, UnsealError> {
        let mut parts = sealed.split('.');
        let (payload, timestamp, tag) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(p), Some(ts), Some(t), None) => (p, ts, t),
            _ => return Err(UnsealError::Decode("malformed token".into())),
        };

        let timestamp: i64 = timestamp
            .parse()
            .map_err(|_| UnsealError::Decode("malformed timestamp".into()))?;
        let tag = URL_SAFE_NO_PAD
            .decode(tag)
            .map_err(|_| UnsealError::Decode("malformed signature".into()))?;

        let verified = self.keys.iter().any(|key| {
            Self::tag(key, name, payload, timestamp)
                .map(|mac| mac.verify_slice(&tag).is_ok())
                .unwrap_or(false)
        });
        if !verified {
            return Err(UnsealError::Decode("signature mismatch".into()));
        }

        if self.max_age > 0 && now - timestamp > self.max_age {
            return Err(UnsealError::Decode("token expired".into()));
        }

        let value = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| UnsealError::Decode("malformed payload".into()))?;
        String::from_utf8(value).map_err(|_| UnsealError::Decode("payload is not UTF-8".into()))
    }
}

impl Sealer for KeySealer {
    fn seal(&self, name: &str, value: &str) -> Result<String, SealError> {
        self.seal_at(name, value, OffsetDateTime::now_utc().unix_timestamp())
    }

    fn unseal(&self, name: &str, sealed: &str) -> Result<String, UnsealError> {
        self.unseal_at(name, sealed, OffsetDateTime::now_utc().unix_timestamp())
    }
}
