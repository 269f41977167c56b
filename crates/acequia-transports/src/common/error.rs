//! Common error types for all channels

use std::fmt;

use acequia_entities::ParseError;

/// Result type alias for channel operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Channel-agnostic error type
#[derive(Debug)]
pub enum TransportError {
    /// Failed to connect a channel
    ConnectFailed(String),

    /// Failed to send a message or request
    SendFailed(String),

    /// Failed to receive a message or response
    ReceiveFailed(String),

    /// Timeout after exhausting the retry budget
    Timeout,

    /// No data available (non-blocking receive)
    NoData,

    /// Connection closed by the peer
    ConnectionClosed,

    /// Channel is not connected
    NotRunning,

    /// Channel is already connected
    AlreadyRunning,

    /// Invalid configuration
    InvalidConfig(String),

    /// Malformed or missing field in a wire payload
    Parse(ParseError),

    /// Serial read/write failure; fatal to the current session
    Io(std::io::Error),

    /// Serialization error
    Serialization(String),

    /// Other error
    Other(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed(msg) => write!(f, "Connect failed: {}", msg),
            Self::SendFailed(msg) => write!(f, "Send failed: {}", msg),
            Self::ReceiveFailed(msg) => write!(f, "Receive failed: {}", msg),
            Self::Timeout => write!(f, "Operation timed out"),
            Self::NoData => write!(f, "No data available"),
            Self::ConnectionClosed => write!(f, "Connection closed"),
            Self::NotRunning => write!(f, "Channel is not connected"),
            Self::AlreadyRunning => write!(f, "Channel is already connected"),
            Self::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            Self::Parse(e) => write!(f, "Parse error: {}", e),
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Self::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseError> for TransportError {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<String> for TransportError {
    fn from(msg: String) -> Self {
        Self::Other(msg)
    }
}

impl From<&str> for TransportError {
    fn from(msg: &str) -> Self {
        Self::Other(msg.to_string())
    }
}
