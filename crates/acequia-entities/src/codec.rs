//! Bidirectional JSON <-> entity codecs
//!
//! One codec per entity kind, all behind the [`EntityCodec`] trait, and
//! a [`CodecRegistry`] that owns the canonical instance of each. Wire
//! contract per kind:
//!
//! - relay: `{"_id": string, "name": string, "status": bool,
//!   "currentCycle": cycle?}`
//! - cycle: `{"name": string, "on": number, "off": number,
//!   "relayId": string?}` (durations in seconds)
//! - alert: `{"message": string}`

use serde_json::{json, Map, Value};

use crate::error::ParseError;
use crate::models::{Alert, Cycle, Entity, EntityKind, Relay};

/// A bidirectional codec between wire JSON objects and one entity kind.
///
/// `parse` fails on any missing or mistyped field. `serialize` fails
/// only when handed an entity of the wrong kind, which the registry
/// makes impossible on the normal path.
pub trait EntityCodec: Send + Sync {
    /// The entity kind this codec handles.
    fn kind(&self) -> EntityKind;

    /// Decode one wire object into an entity.
    fn parse(&self, value: &Value) -> Result<Entity, ParseError>;

    /// Encode an entity into its wire object.
    fn serialize(&self, entity: &Entity) -> Result<Value, ParseError>;
}

fn as_object<'v>(value: &'v Value) -> Result<&'v Map<String, Value>, ParseError> {
    value.as_object().ok_or(ParseError::NotAnObject)
}

fn get_str(obj: &Map<String, Value>, field: &'static str) -> Result<String, ParseError> {
    let value = obj.get(field).ok_or(ParseError::MissingField(field))?;
    value
        .as_str()
        .map(str::to_owned)
        .ok_or(ParseError::InvalidField {
            field,
            expected: "string",
        })
}

fn get_bool(obj: &Map<String, Value>, field: &'static str) -> Result<bool, ParseError> {
    let value = obj.get(field).ok_or(ParseError::MissingField(field))?;
    value.as_bool().ok_or(ParseError::InvalidField {
        field,
        expected: "boolean",
    })
}

fn get_seconds(obj: &Map<String, Value>, field: &'static str) -> Result<u32, ParseError> {
    let value = obj.get(field).ok_or(ParseError::MissingField(field))?;
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or(ParseError::InvalidField {
            field,
            expected: "non-negative number",
        })
}

fn wrong_entity(expected: EntityKind, got: &Entity) -> ParseError {
    ParseError::WrongEntity {
        expected: expected.as_str(),
        got: got.kind().as_str(),
    }
}

/// Codec for [`Relay`] objects.
#[derive(Debug, Default, Clone, Copy)]
pub struct RelayCodec;

impl RelayCodec {
    fn parse_relay(value: &Value) -> Result<Relay, ParseError> {
        let obj = as_object(value)?;
        let current_cycle = match obj.get("currentCycle") {
            Some(Value::Null) | None => None,
            Some(cycle) => Some(CycleCodec::parse_cycle(cycle)?),
        };
        Ok(Relay {
            id: get_str(obj, "_id")?,
            name: get_str(obj, "name")?,
            status: get_bool(obj, "status")?,
            current_cycle,
        })
    }
}

impl EntityCodec for RelayCodec {
    fn kind(&self) -> EntityKind {
        EntityKind::Relay
    }

    fn parse(&self, value: &Value) -> Result<Entity, ParseError> {
        Self::parse_relay(value).map(Entity::Relay)
    }

    fn serialize(&self, entity: &Entity) -> Result<Value, ParseError> {
        let relay = entity
            .as_relay()
            .ok_or_else(|| wrong_entity(EntityKind::Relay, entity))?;
        let mut wire = json!({
            "_id": relay.id,
            "name": relay.name,
            "status": relay.status,
        });
        if let Some(cycle) = &relay.current_cycle {
            wire["currentCycle"] = CycleCodec::serialize_cycle(cycle);
        }
        Ok(wire)
    }
}

/// Codec for [`Cycle`] objects.
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleCodec;

impl CycleCodec {
    fn parse_cycle(value: &Value) -> Result<Cycle, ParseError> {
        let obj = as_object(value)?;
        let relay_id = match obj.get("relayId") {
            Some(Value::Null) | None => None,
            Some(_) => Some(get_str(obj, "relayId")?),
        };
        Ok(Cycle {
            name: get_str(obj, "name")?,
            on_seconds: get_seconds(obj, "on")?,
            off_seconds: get_seconds(obj, "off")?,
            relay_id,
        })
    }

    fn serialize_cycle(cycle: &Cycle) -> Value {
        let mut wire = json!({
            "name": cycle.name,
            "on": cycle.on_seconds,
            "off": cycle.off_seconds,
        });
        if let Some(relay_id) = &cycle.relay_id {
            wire["relayId"] = Value::String(relay_id.clone());
        }
        wire
    }
}

impl EntityCodec for CycleCodec {
    fn kind(&self) -> EntityKind {
        EntityKind::Cycle
    }

    fn parse(&self, value: &Value) -> Result<Entity, ParseError> {
        Self::parse_cycle(value).map(Entity::Cycle)
    }

    fn serialize(&self, entity: &Entity) -> Result<Value, ParseError> {
        let cycle = entity
            .as_cycle()
            .ok_or_else(|| wrong_entity(EntityKind::Cycle, entity))?;
        Ok(Self::serialize_cycle(cycle))
    }
}

/// Codec for [`Alert`] objects.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlertCodec;

impl EntityCodec for AlertCodec {
    fn kind(&self) -> EntityKind {
        EntityKind::Alert
    }

    fn parse(&self, value: &Value) -> Result<Entity, ParseError> {
        let obj = as_object(value)?;
        Ok(Entity::Alert(Alert {
            message: get_str(obj, "message")?,
        }))
    }

    fn serialize(&self, entity: &Entity) -> Result<Value, ParseError> {
        let alert = entity
            .as_alert()
            .ok_or_else(|| wrong_entity(EntityKind::Alert, entity))?;
        Ok(json!({ "message": alert.message }))
    }
}

/// Registry mapping an [`EntityKind`] to its codec.
///
/// The registry is the only codec selection mechanism: call sites name
/// the kind (or hand over an entity, which names it itself) and can
/// never pair a payload with the wrong codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct CodecRegistry {
    relay: RelayCodec,
    cycle: CycleCodec,
    alert: AlertCodec,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_kind(&self, kind: EntityKind) -> &dyn EntityCodec {
        match kind {
            EntityKind::Relay => &self.relay,
            EntityKind::Cycle => &self.cycle,
            EntityKind::Alert => &self.alert,
        }
    }

    /// Serialize an entity through the codec for its own kind.
    pub fn serialize(&self, entity: &Entity) -> Result<Value, ParseError> {
        self.for_kind(entity.kind()).serialize(entity)
    }

    /// Decode one wire object as the given kind.
    pub fn parse(&self, kind: EntityKind, value: &Value) -> Result<Entity, ParseError> {
        self.for_kind(kind).parse(value)
    }
}
