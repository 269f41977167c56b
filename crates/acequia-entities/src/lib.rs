//! # acequia-entities
//!
//! Domain entities for the acequia irrigation controller and the codecs
//! that move them across the wire.
//!
//! Entities are constructed in exactly two ways: by an [`EntityCodec`]
//! decoding a wire JSON object, or by a builder on the outgoing-write
//! path. A list obtained from a fetch fully replaces any previously held
//! list; there is no client-side merge.
//!
//! Codec selection is never ad hoc: [`CodecRegistry`] maps an
//! [`EntityKind`] to its codec, so a relay payload can never end up in
//! the cycle codec by accident.

pub mod codec;
pub mod error;
pub mod models;

pub use codec::{AlertCodec, CodecRegistry, CycleCodec, EntityCodec, RelayCodec};
pub use error::ParseError;
pub use models::{Alert, Cycle, Entity, EntityKind, Relay, TemperatureReading};
