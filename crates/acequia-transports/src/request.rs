// Copyright 2026 the acequia authors
// SPDX-License-Identifier: Apache-2.0

//! Retrying request/response client for the backend REST surface
//!
//! Fetches are retried on a fixed budget (attempt count and per-attempt
//! timeout from [`EndpointConfig`], defaults 2 x 3000 ms) with no
//! backoff and no jitter: the backend is LAN-local and low-volume, so a
//! flat policy beats resilience machinery here. Writes are never
//! retried; they are not known to be idempotent.

use serde_json::Value;
use tracing::{debug, info, warn};

use acequia_entities::{CodecRegistry, Entity, EntityKind};

use crate::common::{EndpointConfig, TransportError, TransportResult};

/// HTTP method for a write request, chosen per call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMethod {
    Put,
    Post,
}

impl WriteMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Put => "PUT",
            Self::Post => "POST",
        }
    }
}

/// Request/response client against `http://{endpoint}/API/{route}`.
///
/// Connectionless: every operation is an independent request. Two
/// concurrent `update` calls are two independent in-flight requests
/// with no ordering guarantee between their completions.
pub struct RequestChannel {
    config: EndpointConfig,
    client: reqwest::Client,
    codecs: CodecRegistry,
}

impl RequestChannel {
    pub fn new(config: EndpointConfig) -> TransportResult<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(Self {
            config,
            client,
            codecs: CodecRegistry::new(),
        })
    }

    /// Fetch the full collection of `kind`, in server order.
    ///
    /// The returned list fully replaces anything the caller holds; no
    /// merging. A network failure or timeout consumes one attempt; a
    /// decode failure aborts the whole batch immediately and is not
    /// retried.
    pub async fn fetch_all(&self, kind: EntityKind) -> TransportResult<Vec<Entity>> {
        let url = self.config.api_url(kind.route());
        let mut last_error = TransportError::Timeout;

        for attempt in 1..=self.config.fetch_attempts {
            match self.fetch_array(&url).await {
                Ok(values) => {
                    let codec = self.codecs.for_kind(kind);
                    let mut entities = Vec::with_capacity(values.len());
                    for value in &values {
                        entities.push(codec.parse(value)?);
                    }
                    debug!("[REQUEST] fetched {} {}", entities.len(), kind.route());
                    return Ok(entities);
                }
                Err(e) => {
                    warn!(
                        "[REQUEST] fetch {} attempt {}/{} failed: {}",
                        kind.route(),
                        attempt,
                        self.config.fetch_attempts,
                        e
                    );
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    /// Issue one write request for `entity` and return the raw response
    /// body.
    ///
    /// The codec is selected from the registry by the entity's own
    /// kind, so a payload can never go through the wrong serializer.
    /// Exactly one request goes out; there is no retry, no coalescing
    /// and no cancellation.
    pub async fn update(&self, entity: &Entity, method: WriteMethod) -> TransportResult<String> {
        let body = self.codecs.serialize(entity)?;
        let url = self.config.api_url(entity.kind().route());

        let request = match method {
            WriteMethod::Put => self.client.put(&url),
            WriteMethod::Post => self.client.post(&url),
        };

        let response = request
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?
            .error_for_status()
            .map_err(from_reqwest)?;

        let text = response.text().await.map_err(from_reqwest)?;
        info!("[REQUEST] {} {} -> {} bytes", method.as_str(), url, text.len());
        Ok(text)
    }

    /// POST a brand-new entity (a cycle created on the client). Same
    /// single-shot policy as [`update`](Self::update).
    pub async fn create(&self, entity: &Entity) -> TransportResult<String> {
        self.update(entity, WriteMethod::Post).await
    }

    async fn fetch_array(&self, url: &str) -> TransportResult<Vec<Value>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(from_reqwest)?
            .error_for_status()
            .map_err(from_reqwest)?;

        let body: Value = response.json().await.map_err(from_reqwest)?;
        match body {
            Value::Array(values) => Ok(values),
            _ => Err(TransportError::ReceiveFailed(
                "expected a JSON array".to_string(),
            )),
        }
    }
}

fn from_reqwest(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::ConnectFailed(e.to_string())
    } else {
        TransportError::ReceiveFailed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creation_validates_config() {
        assert!(RequestChannel::new(EndpointConfig::new("127.0.0.1:3000")).is_ok());
        assert!(RequestChannel::new(EndpointConfig::new("http://nope")).is_err());
    }

    #[test]
    fn write_method_names() {
        assert_eq!(WriteMethod::Put.as_str(), "PUT");
        assert_eq!(WriteMethod::Post.as_str(), "POST");
    }
}
