//! Domain model for the irrigation controller
//!
//! A [`Relay`] is a controllable on/off endpoint (a pump, a valve). A
//! [`Cycle`] is a named on/off duration schedule, optionally bound to a
//! relay. An [`Alert`] is a server-originated notification. Identity of
//! a relay is its backend-assigned `id`; the client never generates one.

use serde::{Deserialize, Serialize};

/// A controllable on/off device endpoint.
///
/// `status` is mutated optimistically by the caller before a write
/// completes; the model itself never reconciles it with the
/// authoritative value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relay {
    pub id: String,
    pub name: String,
    pub status: bool,
    pub current_cycle: Option<Cycle>,
}

impl Relay {
    /// Build a relay for an outgoing write. `id` must be the
    /// backend-assigned identity of an existing relay.
    pub fn new(id: impl Into<String>, name: impl Into<String>, status: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status,
            current_cycle: None,
        }
    }

    pub fn with_cycle(mut self, cycle: Cycle) -> Self {
        self.current_cycle = Some(cycle);
        self
    }
}

/// A named watering schedule: `on_seconds` active, `off_seconds` idle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    pub name: String,
    pub on_seconds: u32,
    pub off_seconds: u32,
    pub relay_id: Option<String>,
}

impl Cycle {
    pub fn new(name: impl Into<String>, on_seconds: u32, off_seconds: u32) -> Self {
        Self {
            name: name.into(),
            on_seconds,
            off_seconds,
            relay_id: None,
        }
    }

    pub fn for_relay(mut self, relay_id: impl Into<String>) -> Self {
        self.relay_id = Some(relay_id.into());
        self
    }
}

/// A server-originated notification. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub message: String,
}

impl Alert {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Telemetry pushed on the temperature channel. The backend sends both
/// readings as strings; they are surfaced untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub temp1: String,
    pub temp2: String,
}

/// The kinds of entity the backend serves, with their REST collection
/// route segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Relay,
    Cycle,
    Alert,
}

impl EntityKind {
    /// Route segment under `/API/` for this kind's collection.
    pub fn route(&self) -> &'static str {
        match self {
            Self::Relay => "relays",
            Self::Cycle => "cycles",
            Self::Alert => "alerts",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relay => "relay",
            Self::Cycle => "cycle",
            Self::Alert => "alert",
        }
    }
}

/// A decoded wire entity of any kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Relay(Relay),
    Cycle(Cycle),
    Alert(Alert),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Relay(_) => EntityKind::Relay,
            Self::Cycle(_) => EntityKind::Cycle,
            Self::Alert(_) => EntityKind::Alert,
        }
    }

    pub fn as_relay(&self) -> Option<&Relay> {
        match self {
            Self::Relay(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_cycle(&self) -> Option<&Cycle> {
        match self {
            Self::Cycle(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_alert(&self) -> Option<&Alert> {
        match self {
            Self::Alert(a) => Some(a),
            _ => None,
        }
    }

    pub fn into_relay(self) -> Option<Relay> {
        match self {
            Self::Relay(r) => Some(r),
            _ => None,
        }
    }
}

impl From<Relay> for Entity {
    fn from(relay: Relay) -> Self {
        Self::Relay(relay)
    }
}

impl From<Cycle> for Entity {
    fn from(cycle: Cycle) -> Self {
        Self::Cycle(cycle)
    }
}

impl From<Alert> for Entity {
    fn from(alert: Alert) -> Self {
        Self::Alert(alert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_routes() {
        assert_eq!(EntityKind::Relay.route(), "relays");
        assert_eq!(EntityKind::Cycle.route(), "cycles");
        assert_eq!(EntityKind::Alert.route(), "alerts");
    }

    #[test]
    fn entity_kind_matches_variant() {
        let entity: Entity = Relay::new("5a1", "tomatoes", false).into();
        assert_eq!(entity.kind(), EntityKind::Relay);
        assert!(entity.as_relay().is_some());
        assert!(entity.as_cycle().is_none());
    }

    #[test]
    fn cycle_builder_attaches_relay() {
        let cycle = Cycle::new("night", 30, 600).for_relay("5a1");
        assert_eq!(cycle.relay_id.as_deref(), Some("5a1"));
    }
}
