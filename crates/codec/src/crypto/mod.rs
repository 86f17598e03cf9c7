//! AES-256-GCM sealing primitives.
//!
//! This module is intentionally free of configuration and engine concerns.
//! It provides the key container, the nonce source, and the low-level
//! seal/open operations used by the codec.
//!
//! **Algorithm choice:** AES-256-GCM with a fresh random 96-bit nonce per
//! message. Nonce reuse under a given key is catastrophic — it breaks both
//! confidentiality and authentication for the messages involved — so nonces
//! are always drawn from a CSPRNG, never from a counter shared across
//! process restarts.

pub mod cipher;
pub mod nonce;

pub use cipher::{PayloadCipher, SecretKey, KEY_LEN};
pub use nonce::{NonceSource, OsNonceSource};
