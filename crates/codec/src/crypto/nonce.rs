//! Nonce sourcing for the AEAD layer.
//!
//! Production code draws every nonce from the operating system's CSPRNG.
//! The source is a trait so tests can pin nonces and assert on exact wire
//! bytes; nothing outside a test should implement it differently.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::OsRng;
use thiserror::Error;

use common::envelope::NONCE_LEN;

/// The entropy source failed while producing a nonce.
#[derive(Debug, Error)]
#[error("entropy source failure: {0}")]
pub struct NonceError(pub String);

/// Supplier of fresh 96-bit AEAD nonces.
///
/// Every nonce must be unique for the usage lifetime of the key it is
/// combined with.
#[cfg_attr(test, mockall::automock)]
pub trait NonceSource: Send + Sync {
    /// Fill `buf` with the next nonce.
    ///
    /// # Errors
    ///
    /// Fails only when the underlying entropy source does; the failure is
    /// fatal for the encode call that triggered it.
    fn fill(&self, buf: &mut [u8; NONCE_LEN]) -> Result<(), NonceError>;
}

/// [`NonceSource`] backed by the operating system's CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsNonceSource;

impl NonceSource for OsNonceSource {
    fn fill(&self, buf: &mut [u8; NONCE_LEN]) -> Result<(), NonceError> {
        OsRng
            .try_fill_bytes(buf)
            .map_err(|e| NonceError(e.to_string()))
    }
}
