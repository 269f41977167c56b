//! # acequia
//!
//! Umbrella crate for the acequia irrigation controller's device
//! communication layer. Re-exports the member crates:
//!
//! - [`entities`]: domain model (relays, cycles, alerts) and the JSON
//!   codecs that move it across the wire.
//! - [`transports`]: the communication channels (push socket, retrying
//!   request client, framed serial link) and the connection manager.
//!
//! Most users want the prelude:
//!
//! ```no_run
//! use acequia::prelude::*;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConnectionManager::new(EndpointConfig::new("192.168.0.40:3000"))?;
//! let relays = manager.request_channel()?.fetch_all(EntityKind::Relay).await?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "entities")]
pub use acequia_entities as entities;

#[cfg(feature = "transports")]
pub use acequia_transports as transports;

/// Prelude module for convenient imports
pub mod prelude {
    #[cfg(feature = "entities")]
    pub use acequia_entities::{
        Alert, CodecRegistry, Cycle, Entity, EntityCodec, EntityKind, ParseError, Relay,
        TemperatureReading,
    };

    #[cfg(feature = "transports")]
    pub use acequia_transports::prelude::*;
}
