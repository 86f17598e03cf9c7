//! Envelope classification for payloads sharing one transport.
//!
//! Encrypted and never-encrypted payloads coexist in the same message
//! history (messages recorded before encryption was enabled keep their
//! original encoding). The split is modelled as a variant rather than a
//! loose metadata lookup so the decode branch is exhaustive.
//!
//! # Sealed data layout
//!
//! ```text
//! nonce(12) || ciphertext || tag(16)
//! ```

use std::collections::BTreeMap;

use crate::payload::Payload;

/// Metadata key naming a payload's encoding.
pub const ENCODING_KEY: &str = "encoding";

/// Metadata key carrying the identifier of the key a payload was sealed
/// under. The identifier is a non-secret label and travels in cleartext.
pub const KEY_ID_KEY: &str = "encryption-key-id";

/// Encoding marker for payloads produced by the encryption codec.
/// Exact match required; anything else passes through decode untouched.
pub const ENCRYPTED_MARKER: &[u8] = b"binary/encrypted";

/// AEAD nonce length in bytes (96-bit GCM nonce).
pub const NONCE_LEN: usize = 12;

/// GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// A payload classified by its `encoding` metadata field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// A payload the encryption codec produced: the marker matched and the
    /// key identifier and sealed bytes were extracted.
    Sealed {
        /// Identifier of the key the payload was sealed under. A missing
        /// field yields an empty identifier, which no codec instance will
        /// ever match.
        key_id: String,
        /// `nonce || ciphertext || tag`.
        data: Vec<u8>,
    },
    /// Any other payload; returned from decode byte-for-byte unchanged.
    Opaque(Payload),
}

impl Envelope {
    /// Classify a payload by its `encoding` metadata field.
    pub fn from_payload(payload: Payload) -> Self {
        match payload.metadata.get(ENCODING_KEY) {
            Some(marker) if marker.as_slice() == ENCRYPTED_MARKER => {
                let key_id = payload
                    .metadata
                    .get(KEY_ID_KEY)
                    .map(|raw| String::from_utf8_lossy(raw).into_owned())
                    .unwrap_or_default();
                Envelope::Sealed {
                    key_id,
                    data: payload.data,
                }
            }
            _ => Envelope::Opaque(payload),
        }
    }

    /// Build the sealed variant for freshly encrypted bytes.
    pub fn sealed(key_id: impl Into<String>, data: Vec<u8>) -> Self {
        Envelope::Sealed {
            key_id: key_id.into(),
            data,
        }
    }

    /// Convert back to the wire representation.
    ///
    /// For the sealed variant this writes the marker and key identifier
    /// into the metadata map; the opaque variant is returned as-is.
    pub fn into_payload(self) -> Payload {
        match self {
            Envelope::Sealed { key_id, data } => {
                let mut metadata = BTreeMap::new();
                metadata.insert(ENCODING_KEY.to_owned(), ENCRYPTED_MARKER.to_vec());
                metadata.insert(KEY_ID_KEY.to_owned(), key_id.into_bytes());
                Payload { metadata, data }
            }
            Envelope::Opaque(payload) => payload,
        }
    }
}

/// Split sealed bytes into the 12-byte nonce prefix and the
/// ciphertext+tag remainder.
///
/// Returns `None` when `data` is too short to contain both a nonce and a
/// full authentication tag.
pub fn split_sealed(data: &[u8]) -> Option<(&[u8], &[u8])> {
    if data.len() < NONCE_LEN + TAG_LEN {
        return None;
    }
    Some(data.split_at(NONCE_LEN))
}
