// Copyright 2026 the acequia authors
// SPDX-License-Identifier: Apache-2.0

//! Persistent push/command socket
//!
//! One full-duplex WebSocket to the backend carries every push channel:
//! alerts and command envelopes on `event`, telemetry on `newTemp`.
//! Inbound frames are fanned out to topic subscribers from a single
//! dispatcher task, so subscriber callbacks always run on one delivery
//! context regardless of which thread the socket I/O lands on.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use acequia_entities::{Alert, TemperatureReading};

use crate::common::{
    Command, EndpointConfig, PushEvent, TransportError, TransportResult, WireFrame, EVENT_TOPIC,
    TEMPERATURE_TOPIC,
};
use crate::traits::Transport;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;
type SubscriberFn = Arc<dyn Fn(&Value) + Send + Sync>;
type SubscriberMap = Arc<RwLock<HashMap<String, Vec<(u64, SubscriberFn)>>>>;

/// Push/command socket to the backend.
///
/// `connect` is idempotent and `emit` connects first when needed, so
/// consumers never have to sequence the two themselves. Connection loss
/// is not surfaced as an event; the next `emit` or `connect` attempts a
/// fresh connection.
pub struct EventChannel {
    config: EndpointConfig,
    running: Arc<RwLock<bool>>,
    writer: Arc<tokio::sync::Mutex<Option<WsSink>>>,
    connect_gate: tokio::sync::Mutex<()>,
    subscribers: SubscriberMap,
    next_subscriber_id: AtomicU64,
    dispatch_tx: mpsc::UnboundedSender<WireFrame>,
    dispatch_rx: Mutex<Option<mpsc::UnboundedReceiver<WireFrame>>>,
    reader_handle: Mutex<Option<JoinHandle<()>>>,
}

impl EventChannel {
    /// Create an unconnected channel for the configured endpoint.
    pub fn new(config: EndpointConfig) -> TransportResult<Self> {
        config.validate()?;

        let (dispatch_tx, dispatch_rx) = mpsc::unbounded_channel();

        Ok(Self {
            config,
            running: Arc::new(RwLock::new(false)),
            writer: Arc::new(tokio::sync::Mutex::new(None)),
            connect_gate: tokio::sync::Mutex::new(()),
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            next_subscriber_id: AtomicU64::new(0),
            dispatch_tx,
            dispatch_rx: Mutex::new(Some(dispatch_rx)),
            reader_handle: Mutex::new(None),
        })
    }

    /// Open the socket if it is not already open.
    ///
    /// No-op when connected. On success the reader task is running and
    /// subsequent `emit` calls go straight to the wire.
    pub async fn connect(&self) -> TransportResult<()> {
        let _gate = self.connect_gate.lock().await;

        if *self.running.read() {
            return Ok(());
        }

        let url = self.config.ws_url();
        let (stream, _) = tokio::time::timeout(self.config.connect_timeout, connect_async(&url))
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        info!("[EVENT] Connected to {}", url);

        let (sink, source) = stream.split();
        *self.writer.lock().await = Some(sink);
        *self.running.write() = true;

        // The dispatcher is spawned once and survives reconnects, so
        // subscriptions outlive any single socket session.
        if let Some(rx) = self.dispatch_rx.lock().take() {
            let subscribers = self.subscribers.clone();
            tokio::spawn(dispatch_loop(rx, subscribers));
        }

        let handle = tokio::spawn(read_loop(
            source,
            self.dispatch_tx.clone(),
            self.running.clone(),
        ));
        if let Some(old) = self.reader_handle.lock().replace(handle) {
            old.abort();
        }

        Ok(())
    }

    /// Emit a command on the `event` channel.
    ///
    /// When the socket is down this connects first; the connect attempt
    /// always precedes the send attempt. Each call connects and sends
    /// independently; there is no queue of pending emits.
    pub async fn emit(&self, command: &Command) -> TransportResult<()> {
        if !self.is_connected() {
            self.connect().await?;
        }

        let frame = WireFrame::new(EVENT_TOPIC, command.encode());
        let text = serde_json::to_string(&frame)?;

        let mut guard = self.writer.lock().await;
        let sink = guard.as_mut().ok_or(TransportError::NotRunning)?;

        if let Err(e) = sink.send(Message::Text(text)).await {
            warn!("[EVENT] send failed: {}", e);
            *guard = None;
            *self.running.write() = false;
            return Err(TransportError::SendFailed(e.to_string()));
        }

        debug!("[EVENT] emitted {}", command.event_name());
        Ok(())
    }

    /// Register `callback` for every payload arriving on `topic`.
    ///
    /// Multiple subscribers per topic are allowed; each receives every
    /// payload, in registration order. Dropping (or `cancel`ing) the
    /// returned handle unregisters the callback.
    pub fn subscribe<F>(&self, topic: &str, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .write()
            .entry(topic.to_string())
            .or_default()
            .push((id, Arc::new(callback)));

        debug!("[EVENT] subscriber {} on topic {:?}", id, topic);

        Subscription {
            topic: topic.to_string(),
            id,
            subscribers: self.subscribers.clone(),
        }
    }

    /// Subscribe to server alerts on the `event` channel.
    ///
    /// Payloads that do not decode as an alert are dropped silently;
    /// the `event` channel also carries command envelopes not meant for
    /// this consumer.
    pub fn subscribe_alerts<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Alert) + Send + Sync + 'static,
    {
        self.subscribe(EVENT_TOPIC, move |payload| {
            if let Ok(Some(PushEvent::Alert(alert))) = PushEvent::decode(EVENT_TOPIC, payload) {
                callback(alert);
            }
        })
    }

    /// Subscribe to temperature telemetry on the `newTemp` channel.
    pub fn subscribe_temperatures<F>(&self, callback: F) -> Subscription
    where
        F: Fn(TemperatureReading) + Send + Sync + 'static,
    {
        self.subscribe(TEMPERATURE_TOPIC, move |payload| {
            if let Ok(Some(PushEvent::Temperature(reading))) =
                PushEvent::decode(TEMPERATURE_TOPIC, payload)
            {
                callback(reading);
            }
        })
    }
}

impl Transport for EventChannel {
    fn transport_type(&self) -> &'static str {
        "event"
    }

    fn is_connected(&self) -> bool {
        *self.running.read()
    }

    fn disconnect(&self) {
        *self.running.write() = false;
        if let Some(handle) = self.reader_handle.lock().take() {
            handle.abort();
        }
        // Best effort: a send in flight keeps the sink until it finishes,
        // and the next connect replaces it anyway.
        if let Ok(mut guard) = self.writer.try_lock() {
            *guard = None;
        }
    }
}

/// Handle for one registered subscriber callback.
///
/// The callback stays registered for exactly as long as this handle is
/// alive; dropping it detaches the callback so a discarded consumer is
/// never called again.
pub struct Subscription {
    topic: String,
    id: u64,
    subscribers: SubscriberMap,
}

impl Subscription {
    /// Explicitly unregister the callback. Equivalent to dropping.
    pub fn cancel(self) {}

    /// The topic this subscription listens on.
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut map = self.subscribers.write();
        if let Some(subs) = map.get_mut(&self.topic) {
            subs.retain(|(id, _)| *id != self.id);
            if subs.is_empty() {
                map.remove(&self.topic);
            }
        }
    }
}

/// Forward inbound frames to the dispatcher until the socket ends.
async fn read_loop(
    mut source: WsSource,
    dispatch: mpsc::UnboundedSender<WireFrame>,
    running: Arc<RwLock<bool>>,
) {
    loop {
        match source.next().await {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<WireFrame>(&text) {
                Ok(frame) => {
                    if dispatch.send(frame).is_err() {
                        break;
                    }
                }
                Err(e) => debug!("[EVENT] discarding malformed frame: {}", e),
            },
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("[EVENT] receive error: {}", e);
                break;
            }
        }
    }

    // Loss is not announced; the next emit/connect re-establishes.
    *running.write() = false;
    debug!("[EVENT] reader stopped");
}

/// Fan each frame out to the subscribers of its topic.
///
/// This is the single caller-visible delivery context: every callback
/// for every topic runs here, one payload at a time.
async fn dispatch_loop(mut rx: mpsc::UnboundedReceiver<WireFrame>, subscribers: SubscriberMap) {
    while let Some(frame) = rx.recv().await {
        let callbacks: Vec<SubscriberFn> = {
            let map = subscribers.read();
            map.get(&frame.channel)
                .map(|subs| subs.iter().map(|(_, cb)| cb.clone()).collect())
                .unwrap_or_default()
        };
        for callback in callbacks {
            callback(&frame.data);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> EventChannel {
        EventChannel::new(EndpointConfig::new("127.0.0.1:39990")).unwrap()
    }

    #[test]
    fn starts_disconnected() {
        let channel = channel();
        assert!(!channel.is_connected());
        assert_eq!(channel.transport_type(), "event");
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(EventChannel::new(EndpointConfig::new("")).is_err());
    }

    #[test]
    fn subscription_drop_unregisters() {
        let channel = channel();
        let first = channel.subscribe("event", |_| {});
        let second = channel.subscribe("event", |_| {});
        assert_eq!(channel.subscribers.read().get("event").unwrap().len(), 2);

        drop(first);
        assert_eq!(channel.subscribers.read().get("event").unwrap().len(), 1);

        second.cancel();
        assert!(channel.subscribers.read().get("event").is_none());
    }

    #[test]
    fn topics_are_tracked_separately() {
        let channel = channel();
        let _event = channel.subscribe("event", |_| {});
        let _temp = channel.subscribe("newTemp", |_| {});
        let map = channel.subscribers.read();
        assert_eq!(map.get("event").unwrap().len(), 1);
        assert_eq!(map.get("newTemp").unwrap().len(), 1);
    }
}
