//! Multi-key dispatch across historical codec instances.
//!
//! A message history can span key rotations: payloads sealed last year name
//! a key identifier that is no longer the one used for new writes. The
//! registry holds one [`EncryptionCodec`] per historical key and routes
//! each sealed payload to the instance its metadata names. It never probes
//! other keys — selection is by identifier only.

use std::collections::HashMap;

use tracing::debug;

use common::envelope::Envelope;
use common::{CodecError, Payload, PayloadCodec};

use crate::codec::EncryptionCodec;

/// A set of [`EncryptionCodec`] instances keyed by key identifier.
///
/// `encode` always uses the active codec; `decode` dispatches each sealed
/// payload to the instance registered under the key identifier it names. A
/// sealed payload naming an unregistered identifier fails the batch with
/// [`CodecError::UnknownKey`] — deliberately distinct from
/// [`CodecError::KeyMismatch`], which a single instance raises.
pub struct CodecRegistry {
    codecs: HashMap<String, EncryptionCodec>,
    active: String,
}

impl CodecRegistry {
    /// Create a registry whose active (encoding) codec is `active`.
    pub fn new(active: EncryptionCodec) -> Self {
        let active_id = active.key_id().to_owned();
        debug!(key_id = %active_id, "codec registered as active");
        let mut codecs = HashMap::new();
        codecs.insert(active_id.clone(), active);
        Self {
            codecs,
            active: active_id,
        }
    }

    /// Register `codec` under its key identifier and make it the active
    /// codec for encoding. Replaces any instance already registered under
    /// the same identifier.
    pub fn insert(&mut self, codec: EncryptionCodec) {
        self.active = codec.key_id().to_owned();
        debug!(key_id = %self.active, "codec registered as active");
        self.codecs.insert(self.active.clone(), codec);
    }

    /// Register a historical codec for decoding only; the active codec is
    /// unchanged.
    pub fn insert_historical(&mut self, codec: EncryptionCodec) {
        let key_id = codec.key_id().to_owned();
        debug!(key_id = %key_id, "historical codec registered");
        self.codecs.insert(key_id, codec);
    }

    /// Key identifier of the codec new payloads are sealed under.
    pub fn active_key_id(&self) -> &str {
        &self.active
    }

    fn active_codec(&self) -> &EncryptionCodec {
        // `new` and `insert` keep `active` pointing at a registered codec.
        &self.codecs[&self.active]
    }
}

impl PayloadCodec for CodecRegistry {
    fn encode(&self, payloads: Vec<Payload>) -> Result<Vec<Payload>, CodecError> {
        self.active_codec().encode(payloads)
    }

    fn decode(&self, payloads: Vec<Payload>) -> Result<Vec<Payload>, CodecError> {
        payloads
            .into_iter()
            .map(|payload| match Envelope::from_payload(payload) {
                Envelope::Opaque(p) => Ok(p),
                Envelope::Sealed { key_id, data } => match self.codecs.get(&key_id) {
                    Some(codec) => codec.open_sealed(&data),
                    None => Err(CodecError::UnknownKey(key_id)),
                },
            })
            .collect()
    }
}
