//! In-memory ports for exercising a session without a live producer.

use crate::history::error::HistoryError;
use crate::history::port::{PacketHistory, StoredPacket};
use crate::packet::entity::PacketType;
use crate::transport::error::TransportError;
use crate::transport::port::{ChangeDocument, Inbound, RawMessage, SocketReceiver, Transport};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

type Script<T> = mpsc::UnboundedReceiver<Result<T, TransportError>>;

/// # Summary
/// Feeds a session from a test-controlled script.
///
/// # Invariants
/// - Every `open` hands out a fresh handle; messages pushed while no handle is open are
///   buffered for the next one.
/// - A queued `open_error` is returned by the next `open` instead of a handle.
pub struct ScriptedTransport {
    socket: bool,
    tx: mpsc::UnboundedSender<Result<Vec<Vec<u8>>, TransportError>>,
    rx: std::sync::Arc<tokio::sync::Mutex<Script<Vec<Vec<u8>>>>>,
    open_error: Mutex<Option<TransportError>>,
    opened: Mutex<usize>,
}

impl ScriptedTransport {
    /// Socket-style transport: one pushed payload is one message.
    pub fn socket() -> Self {
        Self::build(true)
    }

    /// Change-stream-style transport: payloads are delivered as change documents.
    pub fn changes() -> Self {
        Self::build(false)
    }

    fn build(socket: bool) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            socket,
            tx,
            rx: std::sync::Arc::new(tokio::sync::Mutex::new(rx)),
            open_error: Mutex::new(None),
            opened: Mutex::new(0),
        }
    }

    /// Queues a single-frame message carrying `payload`.
    pub fn push(&self, payload: &str) {
        self.push_frames(vec![payload.as_bytes().to_vec()]);
    }

    pub fn push_frames(&self, frames: Vec<Vec<u8>>) {
        if self.tx.send(Ok(frames)).is_err() {
            tracing::warn!("Scripted transport script closed");
        }
    }

    /// Makes the currently open handle fail with `error`.
    pub fn fail(&self, error: TransportError) {
        if self.tx.send(Err(error)).is_err() {
            tracing::warn!("Scripted transport script closed");
        }
    }

    pub fn fail_next_open(&self, error: TransportError) {
        *self.open_error.lock().unwrap_or_else(|e| e.into_inner()) = Some(error);
    }

    /// Number of handles opened so far.
    pub fn open_count(&self) -> usize {
        *self.opened.lock().unwrap_or_else(|e| e.into_inner())
    }
}

struct ScriptedSocket {
    rx: std::sync::Arc<tokio::sync::Mutex<Script<Vec<Vec<u8>>>>>,
}

#[async_trait]
impl SocketReceiver for ScriptedSocket {
    async fn try_receive(&mut self, timeout: Duration) -> Result<Option<RawMessage>, TransportError> {
        let mut rx = self.rx.lock().await;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Err(_) => Ok(None),
            Ok(Some(Ok(frames))) => Ok(Some(RawMessage { frames })),
            Ok(Some(Err(e))) => Err(e),
            Ok(None) => Err(TransportError::Closed),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn name(&self) -> String {
        if self.socket {
            "scripted-socket".to_string()
        } else {
            "scripted-changes".to_string()
        }
    }

    async fn open(&self) -> Result<Inbound, TransportError> {
        if let Some(error) = self.open_error.lock().unwrap_or_else(|e| e.into_inner()).take() {
            return Err(error);
        }
        *self.opened.lock().unwrap_or_else(|e| e.into_inner()) += 1;

        let rx = self.rx.clone();
        if self.socket {
            return Ok(Inbound::Socket(Box::new(ScriptedSocket { rx })));
        }

        let stream = async_stream::stream! {
            let mut rx = rx.lock().await;
            while let Some(item) = rx.recv().await {
                yield item.map(|frames| {
                    let message = frames
                        .into_iter()
                        .next()
                        .map(|f| String::from_utf8_lossy(&f).into_owned())
                        .unwrap_or_default();
                    let packet_type = serde_json::from_str::<serde_json::Value>(&message)
                        .ok()
                        .and_then(|v| v.get("type").map(|t| match t {
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        }))
                        .unwrap_or_default();
                    ChangeDocument { packet_type, message }
                });
            }
        };
        Ok(Inbound::Changes(Box::pin(stream)))
    }
}

/// # Summary
/// Packet history backed by a vector, newest entries last.
#[derive(Default)]
pub struct MemoryHistory {
    packets: Mutex<Vec<StoredPacket>>,
    failure: Mutex<Option<HistoryError>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, packet_type: PacketType, message: &str) {
        self.packets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(StoredPacket {
                packet_type,
                message: message.to_string(),
            });
    }

    pub fn fail_with(&self, error: HistoryError) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(error);
    }

    fn check(&self) -> Result<(), HistoryError> {
        match self.failure.lock().unwrap_or_else(|e| e.into_inner()).clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PacketHistory for MemoryHistory {
    async fn latest(&self, packet_type: PacketType) -> Result<Option<StoredPacket>, HistoryError> {
        self.check()?;
        let packets = self.packets.lock().unwrap_or_else(|e| e.into_inner());
        Ok(packets.iter().rev().find(|p| p.packet_type == packet_type).cloned())
    }

    async fn recent(&self, packet_type: PacketType, limit: usize) -> Result<Vec<StoredPacket>, HistoryError> {
        self.check()?;
        let packets = self.packets.lock().unwrap_or_else(|e| e.into_inner());
        Ok(packets
            .iter()
            .rev()
            .filter(|p| p.packet_type == packet_type)
            .take(limit)
            .cloned()
            .collect())
    }
}
