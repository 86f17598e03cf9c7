//! AES-256-GCM encryption and decryption of individual payload blobs.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use thiserror::Error;

use common::envelope::NONCE_LEN;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid key length: expected {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),

    /// AES-GCM encryption or decryption failed.
    #[error("aead operation failed")]
    AeadFailure,
}

/// Fixed-size buffer that holds exactly [`KEY_LEN`] key bytes.
///
/// When this type is dropped, the memory is overwritten with zeroes to
/// minimise the window during which plaintext key material lives in RAM.
pub struct SecretKey(Box<[u8; KEY_LEN]>);

impl SecretKey {
    /// Copy `bytes` into a new [`SecretKey`].
    ///
    /// The key is never truncated or padded: any length other than
    /// [`KEY_LEN`] is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKeyLength`] if `bytes` is not exactly
    /// [`KEY_LEN`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CipherError> {
        if bytes.len() != KEY_LEN {
            return Err(CipherError::InvalidKeyLength(bytes.len()));
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        // Zero the key material on drop.
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material — not even in debug builds.
        f.write_str("SecretKey([REDACTED])")
    }
}

/// AES-256-GCM cipher bound to one key for the lifetime of a codec
/// instance.
///
/// Holds only the expanded key schedule; every call is independent, so one
/// instance may serve concurrent seal/open operations without locking.
pub struct PayloadCipher {
    cipher: Aes256Gcm,
}

impl PayloadCipher {
    /// Build a cipher from validated key material.
    pub fn new(key: &SecretKey) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes())),
        }
    }

    /// Encrypt `plaintext` under `nonce` with no additional authenticated
    /// data, returning `ciphertext || tag`.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::AeadFailure`] on an internal AEAD error
    /// (unreachable with a valid key and nonce).
    pub fn seal(&self, nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        self.cipher
            .encrypt(Nonce::from_slice(nonce), plaintext)
            .map_err(|_| CipherError::AeadFailure)
    }

    /// Decrypt `ciphertext || tag` under `nonce`, returning the plaintext.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::AeadFailure`] if authentication fails — the
    /// data was tampered with, or a different key or nonce was used.
    pub fn open(&self, nonce: &[u8; NONCE_LEN], data: &[u8]) -> Result<Vec<u8>, CipherError> {
        self.cipher
            .decrypt(Nonce::from_slice(nonce), data)
            .map_err(|_| CipherError::AeadFailure)
    }
}
