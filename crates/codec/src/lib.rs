//! AES-256-GCM payload encryption codec for a durable-execution engine.
//!
//! The engine invokes [`EncryptionCodec::encode`] on every outbound message
//! batch before persistence or transmission, and [`EncryptionCodec::decode`]
//! on every inbound batch after retrieval — including on deterministic
//! replay — so the persistence and transport layers never observe plaintext.
//!
//! A codec is bound to exactly one 256-bit key and one key identifier for
//! its lifetime. [`CodecRegistry`] composes several key-bound instances for
//! decoding histories that span key rotations.
//!
//! This crate is intentionally free of engine and transport dependencies.

pub mod codec;
pub mod config;
pub mod crypto;
pub mod registry;

pub use codec::EncryptionCodec;
pub use config::{load_codec, Config};
pub use registry::CodecRegistry;
