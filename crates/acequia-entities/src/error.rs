//! Decode errors for wire payloads

use thiserror::Error;

/// Error produced while decoding a wire JSON object into an entity, or
/// while serializing an entity through the wrong codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The payload is not a JSON object
    #[error("expected a JSON object")]
    NotAnObject,

    /// A required field is absent
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// A field is present but carries the wrong JSON type
    #[error("field `{field}` has the wrong type (expected {expected})")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    /// An entity was handed to a codec for a different kind
    #[error("codec for `{expected}` received a `{got}` entity")]
    WrongEntity {
        expected: &'static str,
        got: &'static str,
    },
}
