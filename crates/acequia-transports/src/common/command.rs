//! Push-channel wire types
//!
//! Everything that crosses the push socket is a [`WireFrame`]: a channel
//! name plus a JSON payload. Outbound command payloads are the tagged
//! [`Command`] union; one serializer produces the
//! `{"type": ..., "args": {...}}` envelope the backend dispatches on.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use acequia_entities::{Alert, ParseError, TemperatureReading};

/// Channel name carrying alerts and command envelopes.
pub const EVENT_TOPIC: &str = "event";

/// Channel name carrying temperature telemetry.
pub const TEMPERATURE_TOPIC: &str = "newTemp";

/// One frame on the push socket: a channel name and its payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFrame {
    pub channel: String,
    pub data: Value,
}

impl WireFrame {
    pub fn new(channel: impl Into<String>, data: Value) -> Self {
        Self {
            channel: channel.into(),
            data,
        }
    }
}

/// A command emitted to the backend over the push socket.
///
/// Serializes as `{"type": <tag>, "args": {...}}`; the tags and the
/// argument keys are the backend's dispatch contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "args")]
pub enum Command {
    /// Toggle a relay by its backend-assigned id
    #[serde(rename = "TOGGLE_PUMP")]
    TogglePump { id: String },

    /// Replace the active watering interval, durations in seconds
    #[serde(rename = "NEW_INTERVAL")]
    NewInterval {
        #[serde(rename = "tempsOn")]
        temps_on: u32,
        #[serde(rename = "tempsOff")]
        temps_off: u32,
    },
}

impl Command {
    /// The wire tag the backend dispatches on
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::TogglePump { .. } => "TOGGLE_PUMP",
            Self::NewInterval { .. } => "NEW_INTERVAL",
        }
    }

    /// Encode the `{"type", "args"}` envelope
    pub fn encode(&self) -> Value {
        // The derive is infallible for these variants
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A decoded inbound push payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    Alert(Alert),
    Temperature(TemperatureReading),
}

impl PushEvent {
    /// Decode a payload received on `topic`.
    ///
    /// Returns `Ok(None)` for a topic this layer does not model, so a
    /// caller can fan raw frames through without treating unknown
    /// channels as failures.
    pub fn decode(topic: &str, payload: &Value) -> Result<Option<Self>, ParseError> {
        match topic {
            EVENT_TOPIC => {
                let alert: Alert = serde_json::from_value(payload.clone())
                    .map_err(|_| ParseError::MissingField("message"))?;
                Ok(Some(Self::Alert(alert)))
            }
            TEMPERATURE_TOPIC => {
                let reading: TemperatureReading = serde_json::from_value(payload.clone())
                    .map_err(|_| ParseError::MissingField("temp1"))?;
                Ok(Some(Self::Temperature(reading)))
            }
            _ => Ok(None),
        }
    }
}
