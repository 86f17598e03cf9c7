//! Error taxonomy surfaced across the codec boundary.

use thiserror::Error;

/// Failures produced by codec construction, encode, or decode.
///
/// Every variant is a hard failure for the call that raised it: the codec
/// performs no internal retries, never falls back to plaintext, and never
/// returns a partial batch. A decode failure aborts the entire batch being
/// processed.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Key material or codec configuration is invalid — wrong key length,
    /// empty key identifier, missing or malformed key string. Raised at
    /// construction time, before any encode/decode call is possible, and is
    /// not retryable.
    #[error("invalid codec configuration: {0}")]
    Configuration(String),

    /// A sealed payload names a key identifier other than the one this
    /// codec instance is bound to. Retrying with the same instance cannot
    /// succeed; the caller must select a different key-bound instance.
    #[error("unknown key ID {found:?}, expected {expected:?}")]
    KeyMismatch {
        /// Key identifier this codec instance is bound to.
        expected: String,
        /// Key identifier found in the payload metadata.
        found: String,
    },

    /// No codec is registered for the key identifier a sealed payload
    /// names. Distinct from [`CodecError::KeyMismatch`]: the registry knows
    /// of several keys and this identifier matches none of them.
    #[error("no codec registered for key ID {0:?}")]
    UnknownKey(String),

    /// Authentication-tag verification failed on decode: the sealed bytes
    /// were tampered with, truncated, or produced under different key
    /// material. A failed tag gives zero confidence about any part of the
    /// content, so nothing is returned.
    #[error("payload authentication failed")]
    Integrity,

    /// The underlying cipher or entropy source failed during encode.
    #[error("payload encryption failed: {0}")]
    Encryption(String),
}
