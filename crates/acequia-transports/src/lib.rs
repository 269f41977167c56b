//! # acequia-transports
//!
//! Device communication layer for the acequia irrigation controller,
//! reconciling three transports with three different failure models:
//!
//! - [`EventChannel`]: persistent WebSocket for server push (alerts,
//!   telemetry) and command emission. Connection loss is absorbed; the
//!   next operation reconnects.
//! - [`RequestChannel`]: HTTP request/response client for CRUD against
//!   the backend, with a fixed retry budget for fetches and strictly
//!   single-shot writes.
//! - [`SerialChannel`]: framed byte stream to a directly paired
//!   microcontroller. Any I/O failure is fatal to the session; the
//!   consumer decides about reconnection.
//!
//! [`ConnectionManager`] owns the endpoint configuration and hands out
//! the shared channel instances.
//!
//! ## Example: toggle a relay over the push socket
//!
//! ```no_run
//! use acequia_transports::{Command, ConnectionManager, EndpointConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConnectionManager::new(EndpointConfig::new("192.168.0.40:3000"))?;
//! let events = manager.event_channel()?;
//!
//! // Connects first if the socket is down, then sends.
//! events.emit(&Command::TogglePump { id: "5a1b".into() }).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Example: fetch every relay
//!
//! ```no_run
//! use acequia_entities::EntityKind;
//! use acequia_transports::{ConnectionManager, EndpointConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConnectionManager::new(EndpointConfig::new("192.168.0.40:3000"))?;
//! let requests = manager.request_channel()?;
//!
//! // Server order, full replacement of anything held before.
//! let relays = requests.fetch_all(EntityKind::Relay).await?;
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod event;
pub mod manager;
pub mod request;
pub mod serial;
pub mod traits;

// Re-export commonly used types
pub use common::{
    Command, EndpointConfig, PushEvent, TransportError, TransportResult, WireFrame, EVENT_TOPIC,
    TEMPERATURE_TOPIC,
};
pub use event::{EventChannel, Subscription};
pub use manager::ConnectionManager;
pub use request::{RequestChannel, WriteMethod};
pub use serial::{LinkState, SerialChannel};
pub use traits::Transport;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::common::*;
    pub use crate::event::{EventChannel, Subscription};
    pub use crate::manager::ConnectionManager;
    pub use crate::request::{RequestChannel, WriteMethod};
    pub use crate::serial::{LinkState, SerialChannel};
    pub use crate::traits::Transport;
}
