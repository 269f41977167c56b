// Copyright 2026 the acequia authors
// SPDX-License-Identifier: Apache-2.0

//! Framed byte-stream link to a directly paired device
//!
//! The paired microcontroller speaks sentinel-delimited ASCII over a
//! point-to-point byte stream (an RFCOMM serial node, or any open
//! reader/writer pair). Inbound bytes are accumulated until the `~`
//! sentinel and dispatched as text frames, in order, from a single
//! dedicated reader thread. Any read or write failure tears the session
//! down; a broken physical link cannot self-heal, so reconnection is an
//! explicit caller decision.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::common::{TransportError, TransportResult};
use crate::traits::Transport;

const BAUD_RATE: u32 = 9600;
const READ_CHUNK: usize = 256;
const FRAME_SENTINEL: u8 = b'~';
const PORT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Connection state of a serial session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

/// Sentinel-framed accumulator over arbitrary read chunk boundaries.
///
/// Bytes go in as they arrive; complete frames (text up to a `~`) come
/// out. Bytes after the last sentinel are retained for the next push.
/// A sentinel with no body is discarded.
struct FrameAccumulator {
    buffer: Vec<u8>,
}

impl FrameAccumulator {
    fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == FRAME_SENTINEL) {
            if pos > 0 {
                frames.push(String::from_utf8_lossy(&self.buffer[..pos]).into_owned());
            }
            self.buffer.drain(..=pos);
        }
        frames
    }
}

/// Everything a session (and its reader thread) shares with the channel.
///
/// Lock order is state, then writer. The generation counter lets a
/// reader thread that outlived its own session exit without touching a
/// newer one.
struct Shared {
    state: RwLock<LinkState>,
    writer: Mutex<Option<Box<dyn Write + Send>>>,
    generation: AtomicU64,
}

impl Shared {
    /// Tear down the session `generation`, unless a newer session has
    /// already replaced it.
    fn teardown(&self, generation: u64) {
        let mut state = self.state.write();
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        *state = LinkState::Disconnected;
        *self.writer.lock() = None;
    }
}

/// Point-to-point framed transport to a paired device.
///
/// State machine `Disconnected -> Connecting -> Connected ->
/// Disconnected`. One dedicated reader thread per connected session;
/// writes from any thread are serialized through a writer lock so
/// concurrent callers cannot interleave bytes on the wire.
pub struct SerialChannel {
    shared: Arc<Shared>,
    reader_thread: Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl SerialChannel {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(LinkState::Disconnected),
                writer: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
            reader_thread: Mutex::new(None),
        }
    }

    /// Current session state.
    pub fn state(&self) -> LinkState {
        *self.shared.state.read()
    }

    /// Open the serial device at `path` and start the session.
    ///
    /// On success the channel is `Connected` and the returned receiver
    /// yields inbound frames in arrival order. On failure the channel
    /// stays `Disconnected`.
    pub fn connect(&self, path: &str) -> TransportResult<Receiver<String>> {
        self.begin_connecting()?;

        let port = serialport::new(path, BAUD_RATE)
            .timeout(PORT_READ_TIMEOUT)
            .open()
            .map_err(|e| {
                *self.shared.state.write() = LinkState::Disconnected;
                warn!("[SERIAL] open {} failed: {}", path, e);
                TransportError::Io(e.into())
            })?;

        let reader = port.try_clone().map_err(|e| {
            *self.shared.state.write() = LinkState::Disconnected;
            TransportError::Io(e.into())
        })?;

        info!("[SERIAL] opened {} at {} baud", path, BAUD_RATE);
        self.start_session(Box::new(reader), Box::new(port))
    }

    /// Start a session over an already-open byte stream (an RFCOMM
    /// socket paired elsewhere). Same contract as
    /// [`connect`](Self::connect).
    ///
    /// The reader should return `Ok(0)` on end-of-stream and time out
    /// periodically rather than block forever, or the reader thread
    /// will only notice a disconnect at the next inbound byte.
    pub fn attach(
        &self,
        reader: Box<dyn Read + Send>,
        writer: Box<dyn Write + Send>,
    ) -> TransportResult<Receiver<String>> {
        self.begin_connecting()?;
        self.start_session(reader, writer)
    }

    /// Write a raw message to the device, blocking until the OS accepts
    /// the bytes.
    ///
    /// Writers are mutually exclusive. Any failure tears the whole
    /// session down; a subsequent `write` before a new `connect` fails
    /// immediately with `NotRunning` and performs no I/O.
    pub fn write(&self, message: &str) -> TransportResult<()> {
        if *self.shared.state.read() != LinkState::Connected {
            return Err(TransportError::NotRunning);
        }
        let generation = self.shared.generation.load(Ordering::SeqCst);

        let mut guard = self.shared.writer.lock();
        let writer = guard.as_mut().ok_or(TransportError::NotRunning)?;

        let result = writer
            .write_all(message.as_bytes())
            .and_then(|()| writer.flush());
        drop(guard);

        if let Err(e) = result {
            warn!("[SERIAL] write failed, session torn down: {}", e);
            self.shared.teardown(generation);
            return Err(TransportError::Io(e));
        }

        debug!("[SERIAL] wrote {} bytes", message.len());
        Ok(())
    }

    /// Send a watering interval as the device's `"<on>,<off>"` command
    /// frame (durations in seconds, no checksum, no acknowledgement).
    pub fn write_interval(&self, on_seconds: u32, off_seconds: u32) -> TransportResult<()> {
        self.write(&format!("{},{}", on_seconds, off_seconds))
    }

    fn begin_connecting(&self) -> TransportResult<()> {
        let mut state = self.shared.state.write();
        match *state {
            LinkState::Disconnected => {
                *state = LinkState::Connecting;
                Ok(())
            }
            _ => Err(TransportError::AlreadyRunning),
        }
    }

    fn start_session(
        &self,
        reader: Box<dyn Read + Send>,
        writer: Box<dyn Write + Send>,
    ) -> TransportResult<Receiver<String>> {
        let (frame_tx, frame_rx) = unbounded();

        let generation = {
            let mut state = self.shared.state.write();
            let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *self.shared.writer.lock() = Some(writer);
            *state = LinkState::Connected;
            generation
        };

        let shared = self.shared.clone();
        let handle = std::thread::Builder::new()
            .name("acequia-serial-reader".to_string())
            .spawn(move || read_loop(reader, frame_tx, shared, generation))
            .map_err(|e| {
                self.shared.teardown(generation);
                TransportError::Io(e)
            })?;

        *self.reader_thread.lock() = Some(handle);
        Ok(frame_rx)
    }
}

impl Default for SerialChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SerialChannel {
    fn transport_type(&self) -> &'static str {
        "serial"
    }

    fn is_connected(&self) -> bool {
        *self.shared.state.read() == LinkState::Connected
    }

    fn disconnect(&self) {
        let generation = self.shared.generation.load(Ordering::SeqCst);
        self.shared.teardown(generation);
        // The reader thread observes the teardown at its next read
        // timeout and exits on its own.
    }
}

/// Dedicated reader: exactly one per connected session.
fn read_loop(
    mut reader: Box<dyn Read + Send>,
    frames: Sender<String>,
    shared: Arc<Shared>,
    generation: u64,
) {
    let mut chunk = [0u8; READ_CHUNK];
    let mut accumulator = FrameAccumulator::new();

    'session: loop {
        if shared.generation.load(Ordering::SeqCst) != generation
            || *shared.state.read() != LinkState::Connected
        {
            break;
        }

        match reader.read(&mut chunk) {
            Ok(0) => {
                info!("[SERIAL] end of stream");
                break;
            }
            Ok(n) => {
                for frame in accumulator.push(&chunk[..n]) {
                    debug!("[SERIAL] frame: {:?}", frame);
                    if frames.send(frame).is_err() {
                        // Receiver gone; the session has no consumer left.
                        break 'session;
                    }
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::TimedOut
                        | std::io::ErrorKind::WouldBlock
                        | std::io::ErrorKind::Interrupted
                ) =>
            {
                continue;
            }
            Err(e) => {
                warn!("[SERIAL] read failed: {}", e);
                break;
            }
        }
    }

    shared.teardown(generation);
    debug!("[SERIAL] reader stopped");
}
