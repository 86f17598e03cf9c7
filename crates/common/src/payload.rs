//! The wire unit exchanged with the orchestration engine, and the codec
//! interface the engine invokes on it.
//!
//! A [`Payload`] is serialised as JSON with base64-encoded byte fields so it
//! can travel over text transports and be persisted by the engine unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// One message as the engine stores and transports it: an opaque `data`
/// blob plus a metadata map describing how `data` is encoded.
///
/// The codec never interprets `data`; it only reads and writes the
/// `encoding` and `encryption-key-id` metadata fields defined in
/// [`crate::envelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Encoding metadata. Keys are UTF-8 strings; values are raw bytes.
    #[serde(with = "b64_map", default)]
    pub metadata: BTreeMap<String, Vec<u8>>,

    /// Uninterpreted message bytes.
    #[serde(with = "b64")]
    pub data: Vec<u8>,
}

impl Payload {
    /// Build a payload with no metadata.
    pub fn raw(data: impl Into<Vec<u8>>) -> Self {
        Self {
            metadata: BTreeMap::new(),
            data: data.into(),
        }
    }
}

/// Bidirectional transform the engine applies to every message batch:
/// `encode` on the write path before persistence or transmission, `decode`
/// on the read path after retrieval and before payloads reach application
/// code — including on deterministic replay, where `decode` is re-invoked
/// identically on the same inputs.
///
/// Implementations must process payloads independently and
/// order-preservingly, and must fail the whole batch rather than return
/// partial results.
pub trait PayloadCodec: Send + Sync {
    /// Transform payloads before they leave the process.
    fn encode(&self, payloads: Vec<Payload>) -> Result<Vec<Payload>, CodecError>;

    /// Reverse [`PayloadCodec::encode`] on retrieved payloads.
    fn decode(&self, payloads: Vec<Payload>) -> Result<Vec<Payload>, CodecError>;
}

mod b64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

mod b64_map {
    use std::collections::BTreeMap;

    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<String, Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_map(Some(map.len()))?;
        for (key, value) in map {
            out.serialize_entry(key, &STANDARD.encode(value))?;
        }
        out.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Vec<u8>>, D::Error> {
        let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(key, value)| {
                let bytes = STANDARD
                    .decode(value.as_bytes())
                    .map_err(serde::de::Error::custom)?;
                Ok((key, bytes))
            })
            .collect()
    }
}
