//! Common types shared between the encryption codec and the engine-facing
//! side of the boundary: the [`Payload`] wire unit, the [`Envelope`]
//! classification, the [`PayloadCodec`] trait, and the error taxonomy.

pub mod envelope;
pub mod error;
pub mod payload;

pub use envelope::Envelope;
pub use error::CodecError;
pub use payload::{Payload, PayloadCodec};
