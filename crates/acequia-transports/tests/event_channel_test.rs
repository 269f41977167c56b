//! Push socket integration tests
//!
//! Each test runs a real WebSocket peer on a loopback listener and
//! drives the channel end-to-end.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use acequia_transports::prelude::*;

/// Accepts any number of clients and forwards every inbound text frame.
async fn start_recording_server() -> (String, mpsc::UnboundedReceiver<String>, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("127.0.0.1:{}", listener.local_addr().unwrap().port());
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let connections = Arc::new(AtomicUsize::new(0));

    let counter = connections.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let inbound_tx = inbound_tx.clone();
            tokio::spawn(async move {
                let Ok(ws) = accept_async(stream).await else {
                    return;
                };
                let (_sink, mut source) = ws.split();
                while let Some(Ok(msg)) = source.next().await {
                    if let Message::Text(text) = msg {
                        let _ = inbound_tx.send(text);
                    }
                }
            });
        }
    });

    (endpoint, inbound_rx, connections)
}

/// Accepts one client and pushes every queued frame to it.
async fn start_pushing_server() -> (String, mpsc::UnboundedSender<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("127.0.0.1:{}", listener.local_addr().unwrap().port());
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let Ok(ws) = accept_async(stream).await else {
            return;
        };
        let (mut sink, _source) = ws.split();
        while let Some(text) = outbound_rx.recv().await {
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    (endpoint, outbound_tx)
}

#[tokio::test]
async fn emit_connects_before_sending() {
    let (endpoint, mut inbound, connections) = start_recording_server().await;
    let channel = EventChannel::new(EndpointConfig::new(endpoint)).unwrap();

    assert!(!channel.is_connected());

    // No explicit connect: emit must establish the connection first.
    channel
        .emit(&Command::TogglePump { id: "5a1b".into() })
        .await
        .unwrap();

    assert!(channel.is_connected());
    assert_eq!(connections.load(Ordering::SeqCst), 1);

    let text = timeout(Duration::from_secs(2), inbound.recv())
        .await
        .unwrap()
        .unwrap();
    let frame: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(frame["channel"], "event");
    assert_eq!(frame["data"]["type"], "TOGGLE_PUMP");
    assert_eq!(frame["data"]["args"]["id"], "5a1b");
}

#[tokio::test]
async fn connect_is_idempotent() {
    let (endpoint, _inbound, connections) = start_recording_server().await;
    let channel = EventChannel::new(EndpointConfig::new(endpoint)).unwrap();

    channel.connect().await.unwrap();
    channel.connect().await.unwrap();
    channel.connect().await.unwrap();

    sleep(Duration::from_millis(100)).await;
    assert_eq!(connections.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn connect_failure_is_reported() {
    // Nothing listens here.
    let channel = EventChannel::new(EndpointConfig::new("127.0.0.1:39997")).unwrap();

    let result = channel.connect().await;
    assert!(matches!(result, Err(TransportError::ConnectFailed(_))));
    assert!(!channel.is_connected());

    // emit propagates the same failure path.
    let command = Command::NewInterval {
        temps_on: 3,
        temps_off: 15,
    };
    assert!(channel.emit(&command).await.is_err());
}

#[tokio::test]
async fn subscribers_fan_out_per_topic() {
    let (endpoint, push) = start_pushing_server().await;
    let channel = EventChannel::new(EndpointConfig::new(endpoint)).unwrap();

    let (first_tx, mut first_rx) = mpsc::unbounded_channel();
    let (second_tx, mut second_rx) = mpsc::unbounded_channel();

    let _first = channel.subscribe("event", move |payload| {
        let _ = first_tx.send(payload.clone());
    });
    let _second = channel.subscribe("event", move |payload| {
        let _ = second_tx.send(payload.clone());
    });

    channel.connect().await.unwrap();
    sleep(Duration::from_millis(100)).await;

    push.send(json!({ "channel": "event", "data": { "message": "niveau d'eau bas" } }).to_string())
        .unwrap();

    let payload = timeout(Duration::from_secs(2), first_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payload["message"], "niveau d'eau bas");

    let payload = timeout(Duration::from_secs(2), second_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payload["message"], "niveau d'eau bas");
}

#[tokio::test]
async fn dropped_subscription_stops_delivery() {
    let (endpoint, push) = start_pushing_server().await;
    let channel = EventChannel::new(EndpointConfig::new(endpoint)).unwrap();

    let (kept_tx, mut kept_rx) = mpsc::unbounded_channel();
    let (dropped_tx, mut dropped_rx) = mpsc::unbounded_channel::<Value>();

    let kept = channel.subscribe("event", move |payload| {
        let _ = kept_tx.send(payload.clone());
    });
    let doomed = channel.subscribe("event", move |payload| {
        let _ = dropped_tx.send(payload.clone());
    });

    channel.connect().await.unwrap();
    sleep(Duration::from_millis(100)).await;

    drop(doomed);
    push.send(json!({ "channel": "event", "data": { "message": "après détachement" } }).to_string())
        .unwrap();

    let payload = timeout(Duration::from_secs(2), kept_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payload["message"], "après détachement");

    // The detached callback saw nothing.
    assert!(timeout(Duration::from_millis(200), dropped_rx.recv())
        .await
        .is_err());

    drop(kept);
}

#[tokio::test]
async fn typed_subscriptions_decode_payloads() {
    let (endpoint, push) = start_pushing_server().await;
    let channel = EventChannel::new(EndpointConfig::new(endpoint)).unwrap();

    let (alert_tx, mut alert_rx) = mpsc::unbounded_channel();
    let (temp_tx, mut temp_rx) = mpsc::unbounded_channel();

    let _alerts = channel.subscribe_alerts(move |alert| {
        let _ = alert_tx.send(alert);
    });
    let _temps = channel.subscribe_temperatures(move |reading| {
        let _ = temp_tx.send(reading);
    });

    channel.connect().await.unwrap();
    sleep(Duration::from_millis(100)).await;

    push.send(json!({ "channel": "event", "data": { "message": "pompe bloquée" } }).to_string())
        .unwrap();
    push.send(json!({ "channel": "newTemp", "data": { "temp1": "21.5", "temp2": "18.0" } }).to_string())
        .unwrap();

    let alert = timeout(Duration::from_secs(2), alert_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(alert.message, "pompe bloquée");

    let reading = timeout(Duration::from_secs(2), temp_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reading.temp1, "21.5");
    assert_eq!(reading.temp2, "18.0");
}
