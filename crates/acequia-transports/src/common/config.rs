//! Endpoint configuration shared by the channels

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one backend endpoint.
///
/// The endpoint is a bare `host[:port]` read once at startup; channel
/// instances built from it keep it for the process lifetime.
/// Reconfiguration means building a new [`crate::ConnectionManager`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Backend address as `host[:port]`, no scheme
    pub endpoint: String,

    /// Per-attempt bound for a fetch request
    pub request_timeout: Duration,

    /// Fixed fetch attempt count (no backoff, no jitter)
    pub fetch_attempts: u32,

    /// Bound for opening the push socket
    pub connect_timeout: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:3000".to_string(),
            request_timeout: Duration::from_millis(3000),
            fetch_attempts: 2,
            connect_timeout: Duration::from_millis(3000),
        }
    }
}

impl EndpointConfig {
    /// Create a new config for the given `host[:port]`
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Set the per-attempt fetch timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the fetch attempt count
    pub fn with_fetch_attempts(mut self, attempts: u32) -> Self {
        self.fetch_attempts = attempts;
        self
    }

    /// Set the push-socket connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Base URL for the REST surface
    pub fn http_url(&self) -> String {
        format!("http://{}", self.endpoint)
    }

    /// URL of one collection route under `/API/`
    pub fn api_url(&self, route: &str) -> String {
        format!("http://{}/API/{}", self.endpoint, route)
    }

    /// URL of the push socket
    pub fn ws_url(&self) -> String {
        format!("ws://{}/", self.endpoint)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.is_empty() {
            return Err("Endpoint cannot be empty".to_string());
        }

        if self.endpoint.contains("://") {
            return Err("Endpoint must be host[:port] without a scheme".to_string());
        }

        if self.fetch_attempts == 0 {
            return Err("Fetch attempt count must be greater than 0".to_string());
        }

        Ok(())
    }
}
