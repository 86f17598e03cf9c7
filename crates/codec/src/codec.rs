//! [`EncryptionCodec`]: the authenticated payload transform.
//!
//! # Security invariants
//!
//! - Key material is **never** logged, serialised, or exposed outside the
//!   seal/open data path; only the non-secret key identifier travels in
//!   envelope metadata.
//! - Every sealed payload uses a fresh CSPRNG nonce.
//! - A decode failure aborts the whole batch: no partial plaintext, no
//!   fallback to unauthenticated output.

use std::sync::Arc;

use tracing::warn;

use common::envelope::{self, Envelope, NONCE_LEN};
use common::{CodecError, Payload, PayloadCodec};

use crate::crypto::cipher::{PayloadCipher, SecretKey};
use crate::crypto::nonce::{NonceSource, OsNonceSource};

/// AES-256-GCM codec bound to exactly one symmetric key and key identifier.
///
/// An instance is constructed once at process initialisation and shared for
/// the process lifetime. Apart from the immutable key material it holds no
/// state between calls, so a single instance may serve arbitrarily many
/// concurrent encode/decode invocations without locking.
pub struct EncryptionCodec {
    key_id: String,
    cipher: PayloadCipher,
    nonces: Arc<dyn NonceSource>,
}

impl EncryptionCodec {
    /// Bind a codec to `key_id` and 32 bytes of key material, drawing
    /// nonces from the OS CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Configuration`] if `key_id` is empty or `key`
    /// is not exactly 32 bytes. This is the only validation point: a
    /// constructed codec cannot fail on key shape later, so
    /// misconfiguration surfaces at startup rather than at first use.
    pub fn new(key_id: impl Into<String>, key: &[u8]) -> Result<Self, CodecError> {
        Self::with_nonce_source(key_id, key, Arc::new(OsNonceSource))
    }

    /// Like [`EncryptionCodec::new`] with an explicit nonce source.
    ///
    /// Production code has no reason to pass anything but
    /// [`OsNonceSource`]; the injection point exists so tests can pin
    /// nonces and assert on exact wire bytes.
    ///
    /// # Errors
    ///
    /// Same contract as [`EncryptionCodec::new`].
    pub fn with_nonce_source(
        key_id: impl Into<String>,
        key: &[u8],
        nonces: Arc<dyn NonceSource>,
    ) -> Result<Self, CodecError> {
        let key_id = key_id.into();
        if key_id.is_empty() {
            return Err(CodecError::Configuration("key ID must not be empty".into()));
        }
        let key = SecretKey::from_bytes(key).map_err(|e| CodecError::Configuration(e.to_string()))?;
        Ok(Self {
            key_id,
            cipher: PayloadCipher::new(&key),
            nonces,
        })
    }

    /// The key identifier this codec stamps into every sealed payload.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Seal every payload in the batch, order-preservingly.
    ///
    /// Each payload is serialised, encrypted under a fresh random nonce
    /// with no additional authenticated data, and replaced by a wire
    /// payload whose data is `nonce || ciphertext || tag` and whose
    /// metadata carries the encrypted marker and this codec's key
    /// identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encryption`] if the cipher or the entropy
    /// source fails; valid input has no other failure modes.
    pub fn encode(&self, payloads: Vec<Payload>) -> Result<Vec<Payload>, CodecError> {
        payloads.into_iter().map(|p| self.seal_one(p)).collect()
    }

    /// Reverse [`EncryptionCodec::encode`] on a batch, order-preservingly.
    ///
    /// Payloads without the encrypted marker pass through unchanged, so
    /// messages recorded before encryption was enabled decode alongside
    /// sealed ones.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::KeyMismatch`] if a sealed payload names a key
    /// identifier other than this codec's, without attempting decryption,
    /// and [`CodecError::Integrity`] if authentication fails. Either error
    /// aborts the entire batch.
    pub fn decode(&self, payloads: Vec<Payload>) -> Result<Vec<Payload>, CodecError> {
        payloads.into_iter().map(|p| self.open_one(p)).collect()
    }

    fn seal_one(&self, payload: Payload) -> Result<Payload, CodecError> {
        let plaintext =
            serde_json::to_vec(&payload).map_err(|e| CodecError::Encryption(e.to_string()))?;

        let mut nonce = [0u8; NONCE_LEN];
        self.nonces
            .fill(&mut nonce)
            .map_err(|e| CodecError::Encryption(e.to_string()))?;

        let sealed = self
            .cipher
            .seal(&nonce, &plaintext)
            .map_err(|e| CodecError::Encryption(e.to_string()))?;

        let mut data = Vec::with_capacity(NONCE_LEN + sealed.len());
        data.extend_from_slice(&nonce);
        data.extend_from_slice(&sealed);
        Ok(Envelope::sealed(self.key_id.clone(), data).into_payload())
    }

    fn open_one(&self, payload: Payload) -> Result<Payload, CodecError> {
        match Envelope::from_payload(payload) {
            Envelope::Opaque(p) => Ok(p),
            Envelope::Sealed { key_id, data } => {
                if key_id != self.key_id {
                    return Err(CodecError::KeyMismatch {
                        expected: self.key_id.clone(),
                        found: key_id,
                    });
                }
                self.open_sealed(&data)
            }
        }
    }

    /// Open sealed bytes already known to belong to this codec's key.
    ///
    /// Also the dispatch target of [`crate::registry::CodecRegistry`],
    /// which has matched the key identifier itself.
    pub(crate) fn open_sealed(&self, data: &[u8]) -> Result<Payload, CodecError> {
        let Some((nonce, remainder)) = envelope::split_sealed(data) else {
            warn!(key_id = %self.key_id, "sealed payload too short to authenticate");
            return Err(CodecError::Integrity);
        };

        let mut nonce_buf = [0u8; NONCE_LEN];
        nonce_buf.copy_from_slice(nonce);
        let plaintext = self.cipher.open(&nonce_buf, remainder).map_err(|_| {
            warn!(key_id = %self.key_id, "payload authentication failed");
            CodecError::Integrity
        })?;

        // The plaintext is authenticated, so a deserialisation failure means
        // the sealed bytes never held a payload; treat it the same as
        // corruption rather than surfacing half-decoded output.
        serde_json::from_slice(&plaintext).map_err(|_| {
            warn!(key_id = %self.key_id, "authenticated payload failed to deserialise");
            CodecError::Integrity
        })
    }
}

impl PayloadCodec for EncryptionCodec {
    fn encode(&self, payloads: Vec<Payload>) -> Result<Vec<Payload>, CodecError> {
        EncryptionCodec::encode(self, payloads)
    }

    fn decode(&self, payloads: Vec<Payload>) -> Result<Vec<Payload>, CodecError> {
        EncryptionCodec::decode(self, payloads)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use common::envelope::{ENCODING_KEY, ENCRYPTED_MARKER, KEY_ID_KEY, NONCE_LEN, TAG_LEN};

    use super::*;
    use crate::crypto::nonce::{MockNonceSource, NonceError};

    const ZERO_KEY: [u8; 32] = [0u8; 32];

    fn default_codec() -> EncryptionCodec {
        EncryptionCodec::new("default-key", &ZERO_KEY).unwrap()
    }

    fn ping() -> Payload {
        Payload::raw(b"ping".to_vec())
    }

    #[test]
    fn round_trip_identity() {
        let codec = default_codec();
        let mut payload = Payload::raw(b"structured message".to_vec());
        payload
            .metadata
            .insert("encoding".into(), b"json/plain".to_vec());

        let encoded = codec.encode(vec![payload.clone()]).unwrap();
        let decoded = codec.decode(encoded).unwrap();
        assert_eq!(decoded, vec![payload]);
    }

    #[test]
    fn encode_stamps_wire_metadata() {
        let codec = default_codec();
        let encoded = codec.encode(vec![ping()]).unwrap();
        assert_eq!(encoded.len(), 1);

        let envelope = &encoded[0];
        assert_eq!(
            envelope.metadata.get(ENCODING_KEY).unwrap().as_slice(),
            ENCRYPTED_MARKER
        );
        assert_eq!(
            envelope.metadata.get(KEY_ID_KEY).unwrap().as_slice(),
            b"default-key"
        );
        assert!(envelope.data.len() > NONCE_LEN + TAG_LEN);
    }

    #[test]
    fn encode_hides_plaintext() {
        let codec = default_codec();
        let encoded = codec.encode(vec![ping()]).unwrap();
        let window = encoded[0].data.windows(4).any(|w| w == b"ping");
        assert!(!window, "plaintext leaked into sealed data");
    }

    #[test]
    fn concrete_scenario_zero_key_ping() {
        // key = 32 zero bytes, key-id = "default-key", payload = "ping"
        let codec = default_codec();
        let encoded = codec.encode(vec![ping()]).unwrap();
        let decoded = codec.decode(encoded.clone()).unwrap();
        assert_eq!(decoded, vec![ping()]);

        // Same envelope, same key bytes, different key-id: hard failure.
        let other = EncryptionCodec::new("other-key", &ZERO_KEY).unwrap();
        match other.decode(encoded) {
            Err(CodecError::KeyMismatch { expected, found }) => {
                assert_eq!(expected, "other-key");
                assert_eq!(found, "default-key");
            }
            other => panic!("expected KeyMismatch, got {other:?}"),
        }
    }

    #[test]
    fn pass_through_is_byte_exact() {
        let codec = default_codec();
        let mut plaintext = Payload::raw(b"{\"v\":1}".to_vec());
        plaintext
            .metadata
            .insert(ENCODING_KEY.into(), b"json/plain".to_vec());
        plaintext.metadata.insert("extra".into(), vec![0xDE, 0xAD]);

        let decoded = codec.decode(vec![plaintext.clone()]).unwrap();
        assert_eq!(decoded, vec![plaintext]);
    }

    #[test]
    fn mixed_batch_decodes_in_order() {
        let codec = default_codec();
        let sealed = codec.encode(vec![ping()]).unwrap().remove(0);
        let plain = Payload::raw(b"never encrypted".to_vec());

        let decoded = codec
            .decode(vec![plain.clone(), sealed, plain.clone()])
            .unwrap();
        assert_eq!(decoded[0], plain);
        assert_eq!(decoded[1], ping());
        assert_eq!(decoded[2], plain);
    }

    #[test]
    fn order_preserved_over_batch() {
        let codec = default_codec();
        let batch: Vec<Payload> = (0..8u8)
            .map(|i| Payload::raw(format!("message-{i}").into_bytes()))
            .collect();

        let encoded = codec.encode(batch.clone()).unwrap();
        assert_eq!(encoded.len(), batch.len());
        let decoded = codec.decode(encoded).unwrap();
        assert_eq!(decoded, batch);
    }

    #[test]
    fn nonces_are_unique_across_encodings() {
        let codec = default_codec();
        let mut prefixes = HashSet::new();
        for _ in 0..1000 {
            let encoded = codec.encode(vec![ping()]).unwrap();
            let prefix: [u8; NONCE_LEN] = encoded[0].data[..NONCE_LEN].try_into().unwrap();
            assert!(prefixes.insert(prefix), "nonce repeated across encodings");
        }
    }

    #[test]
    fn any_single_bit_flip_is_detected() {
        let codec = default_codec();
        let sealed = codec.encode(vec![ping()]).unwrap().remove(0);

        for i in 0..sealed.data.len() {
            let mut corrupted = sealed.clone();
            corrupted.data[i] ^= 1 << (i % 8);
            match codec.decode(vec![corrupted]) {
                Err(CodecError::Integrity) => {}
                other => panic!("flip at byte {i} not detected: {other:?}"),
            }
        }
    }

    #[test]
    fn truncated_sealed_data_fails_integrity() {
        let codec = default_codec();
        let mut sealed = codec.encode(vec![ping()]).unwrap().remove(0);
        sealed.data.truncate(NONCE_LEN + TAG_LEN - 1);
        assert!(matches!(
            codec.decode(vec![sealed]),
            Err(CodecError::Integrity)
        ));
    }

    #[test]
    fn failure_aborts_whole_batch() {
        let codec = default_codec();
        let good = codec.encode(vec![ping()]).unwrap().remove(0);
        let mut bad = good.clone();
        bad.data[NONCE_LEN] ^= 0xFF;

        // One bad envelope poisons the batch even when others are valid.
        assert!(codec.decode(vec![good, bad]).is_err());
    }

    #[test]
    fn decode_is_deterministic_across_replays() {
        // Replay re-runs decode on the same stored envelopes; the result
        // must be identical every time.
        let codec = default_codec();
        let encoded = codec.encode(vec![ping()]).unwrap();
        let first = codec.decode(encoded.clone()).unwrap();
        let second = codec.decode(encoded).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_batch_is_identity() {
        let codec = default_codec();
        assert!(codec.encode(Vec::new()).unwrap().is_empty());
        assert!(codec.decode(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn key_length_is_validated_at_construction() {
        assert!(matches!(
            EncryptionCodec::new("k", &[0u8; 31]),
            Err(CodecError::Configuration(_))
        ));
        assert!(matches!(
            EncryptionCodec::new("k", &[0u8; 33]),
            Err(CodecError::Configuration(_))
        ));
        assert!(EncryptionCodec::new("k", &[0u8; 32]).is_ok());
    }

    #[test]
    fn empty_key_id_is_rejected() {
        assert!(matches!(
            EncryptionCodec::new("", &ZERO_KEY),
            Err(CodecError::Configuration(_))
        ));
    }

    #[test]
    fn pinned_nonce_appears_on_the_wire() {
        const PINNED: [u8; NONCE_LEN] = [0xAB; NONCE_LEN];
        let mut source = MockNonceSource::new();
        source.expect_fill().returning(|buf| {
            buf.copy_from_slice(&PINNED);
            Ok(())
        });

        let codec =
            EncryptionCodec::with_nonce_source("default-key", &ZERO_KEY, Arc::new(source)).unwrap();
        let encoded = codec.encode(vec![ping()]).unwrap();
        assert_eq!(&encoded[0].data[..NONCE_LEN], &PINNED);

        // Same key, nonce, and plaintext => identical sealed bytes.
        let again = codec.encode(vec![ping()]).unwrap();
        assert_eq!(again[0].data, encoded[0].data);

        assert_eq!(codec.decode(encoded).unwrap(), vec![ping()]);
    }

    #[test]
    fn entropy_failure_surfaces_as_encryption_error() {
        let mut source = MockNonceSource::new();
        source
            .expect_fill()
            .returning(|_| Err(NonceError("entropy exhausted".into())));

        let codec =
            EncryptionCodec::with_nonce_source("default-key", &ZERO_KEY, Arc::new(source)).unwrap();
        assert!(matches!(
            codec.encode(vec![ping()]),
            Err(CodecError::Encryption(_))
        ));
    }

    #[test]
    fn codec_is_share_safe() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EncryptionCodec>();
    }
}
