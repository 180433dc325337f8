//! Sealing of client-visible values into tamper-evident tokens.
//!
//! The [`Sealer`] trait is the seam between the state layer and whatever
//! cryptographic construction the application uses. The only property the
//! state layer depends on is the decode/non-decode split on
//! [`UnsealError`]: decode failures mean the client handed us garbage and
//! are tolerated, everything else propagates.

mod keyed;

pub use keyed::KeySealer;

use thiserror::Error;

/// Error sealing a value. Always fatal: a seal failure indicates a
/// configuration problem, not client input.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SealError(pub String);

/// Error recovering a sealed value.
#[derive(Debug, Error)]
pub enum UnsealError {
    /// The token is malformed, tampered with, expired, or signed with a key
    /// that is no longer accepted. Treated as "value absent" by callers.
    #[error("sealed value failed verification: {0}")]
    Decode(String),

    /// Any other failure. Propagated.
    #[error("unseal failed: {0}")]
    Internal(String),
}

impl UnsealError {
    /// Whether this failure came from decoding client-supplied data.
    pub fn is_decode(&self) -> bool {
        matches!(self, UnsealError::Decode(_))
    }
}

/// Produces and verifies tamper-evident tokens, bound to a name so a token
/// sealed for one cookie cannot be replayed under another.
pub trait Sealer {
    fn seal(&self, name: &str, value: &str) -> Result<String, SealError>;

    fn unseal(&self, name: &str, sealed: &str) -> Result<String, UnsealError>;
}
