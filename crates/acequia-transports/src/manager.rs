//! Process-wide channel ownership
//!
//! One [`ConnectionManager`] is constructed from the endpoint setting
//! at startup and passed (by `Arc` or reference) to every consumer.
//! Channels are built lazily on first use and shared for the manager's
//! lifetime. The configuration is immutable after construction; a new
//! endpoint means a new manager.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::common::{EndpointConfig, TransportResult};
use crate::event::EventChannel;
use crate::request::RequestChannel;
use crate::serial::SerialChannel;

/// Holder of the active endpoint configuration and the shared channel
/// instances built from it.
pub struct ConnectionManager {
    config: EndpointConfig,
    event: RwLock<Option<Arc<EventChannel>>>,
    request: RwLock<Option<Arc<RequestChannel>>>,
    serial: RwLock<Option<Arc<SerialChannel>>>,
}

impl ConnectionManager {
    pub fn new(config: EndpointConfig) -> TransportResult<Self> {
        config.validate()?;

        Ok(Self {
            config,
            event: RwLock::new(None),
            request: RwLock::new(None),
            serial: RwLock::new(None),
        })
    }

    /// The endpoint configuration this manager was built with.
    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// The shared push/command socket, built on first call.
    pub fn event_channel(&self) -> TransportResult<Arc<EventChannel>> {
        if let Some(channel) = self.event.read().as_ref() {
            return Ok(channel.clone());
        }

        let mut slot = self.event.write();
        if let Some(channel) = slot.as_ref() {
            return Ok(channel.clone());
        }

        debug!("[MANAGER] building event channel for {}", self.config.endpoint);
        let channel = Arc::new(EventChannel::new(self.config.clone())?);
        *slot = Some(channel.clone());
        Ok(channel)
    }

    /// The shared request/response client, built on first call.
    pub fn request_channel(&self) -> TransportResult<Arc<RequestChannel>> {
        if let Some(channel) = self.request.read().as_ref() {
            return Ok(channel.clone());
        }

        let mut slot = self.request.write();
        if let Some(channel) = slot.as_ref() {
            return Ok(channel.clone());
        }

        debug!(
            "[MANAGER] building request channel for {}",
            self.config.endpoint
        );
        let channel = Arc::new(RequestChannel::new(self.config.clone())?);
        *slot = Some(channel.clone());
        Ok(channel)
    }

    /// The shared serial link, built on first call.
    ///
    /// The instance is shared, but its session lifecycle (connect,
    /// teardown on failure, explicit re-pairing) stays with the caller;
    /// the manager never connects it.
    pub fn serial_channel(&self) -> Arc<SerialChannel> {
        if let Some(channel) = self.serial.read().as_ref() {
            return channel.clone();
        }

        let mut slot = self.serial.write();
        if let Some(channel) = slot.as_ref() {
            return channel.clone();
        }

        let channel = Arc::new(SerialChannel::new());
        *slot = Some(channel.clone());
        channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_are_shared_instances() {
        let manager = ConnectionManager::new(EndpointConfig::new("127.0.0.1:3000")).unwrap();

        let a = manager.event_channel().unwrap();
        let b = manager.event_channel().unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let r1 = manager.request_channel().unwrap();
        let r2 = manager.request_channel().unwrap();
        assert!(Arc::ptr_eq(&r1, &r2));

        let s1 = manager.serial_channel();
        let s2 = manager.serial_channel();
        assert!(Arc::ptr_eq(&s1, &s2));
    }

    #[test]
    fn rejects_invalid_endpoint() {
        assert!(ConnectionManager::new(EndpointConfig::new("")).is_err());
    }
}
