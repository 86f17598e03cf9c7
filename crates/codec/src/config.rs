//! Key provisioning: build a validated codec from environment
//! configuration.
//!
//! All values are read from environment variables at startup. Construction
//! fails with a configuration error before any encode/decode call is
//! possible, so a missing or malformed key is caught when the process
//! boots, never at first use.

use serde::Deserialize;
use tracing::info;

use common::CodecError;

use crate::codec::EncryptionCodec;

/// Codec configuration as supplied by the operator.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Hex-encoded 256-bit key (64 characters). **Required.**
    pub encryption_key: String,

    /// Label stamped into every sealed payload's metadata.
    #[serde(default = "default_key_id")]
    pub encryption_key_id: String,
}

fn default_key_id() -> String {
    "default-key".into()
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The key is secret even in its hex form.
        f.debug_struct("Config")
            .field("encryption_key", &"[REDACTED]")
            .field("encryption_key_id", &self.encryption_key_id)
            .finish()
    }
}

impl Config {
    /// Load configuration from the `ENCRYPTION_KEY` and
    /// `ENCRYPTION_KEY_ID` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Configuration`] if `ENCRYPTION_KEY` is absent.
    pub fn from_env() -> Result<Self, CodecError> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .map_err(|e| CodecError::Configuration(e.to_string()))?;

        cfg.try_deserialize()
            .map_err(|e| CodecError::Configuration(e.to_string()))
    }

    /// Decode and validate the key material, producing a ready codec.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Configuration`] if the key string is not valid
    /// hex or does not decode to exactly 32 bytes.
    pub fn into_codec(self) -> Result<EncryptionCodec, CodecError> {
        let key = hex::decode(self.encryption_key.trim())
            .map_err(|e| CodecError::Configuration(format!("encryption key is not valid hex: {e}")))?;
        let codec = EncryptionCodec::new(self.encryption_key_id, &key)?;
        info!(key_id = codec.key_id(), "encryption codec loaded");
        Ok(codec)
    }
}

/// Load the codec from environment configuration in one step.
///
/// # Errors
///
/// Propagates [`CodecError::Configuration`] from [`Config::from_env`] and
/// [`Config::into_codec`].
pub fn load_codec() -> Result<EncryptionCodec, CodecError> {
    Config::from_env()?.into_codec()
}
