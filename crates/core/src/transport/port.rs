use crate::transport::error::TransportError;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::time::Duration;

/// # Summary
/// One message as read from a socket-style transport.
///
/// # Invariants
/// - Only single-frame messages carry a packet; other shapes are skipped by the listener.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawMessage {
    pub frames: Vec<Vec<u8>>,
}

impl RawMessage {
    pub fn single(frame: impl Into<Vec<u8>>) -> Self {
        Self {
            frames: vec![frame.into()],
        }
    }
}

/// # Summary
/// One document from a change-stream-style transport.
///
/// # Invariants
/// - `packet_type` names the kind of `message` (name or numeric code).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeDocument {
    pub packet_type: String,
    pub message: String,
}

/// Change feed; conceptually infinite until dropped.
pub type ChangeStream = Pin<Box<dyn Stream<Item = Result<ChangeDocument, TransportError>> + Send>>;

/// # Summary
/// Bounded-wait receiver of a socket-style transport.
#[async_trait]
pub trait SocketReceiver: Send {
    /// # Summary
    /// Waits at most `timeout` for the next message.
    ///
    /// # Returns
    /// `Ok(None)` on timeout, `Ok(Some(msg))` on a message, `Err` on a fatal failure.
    async fn try_receive(&mut self, timeout: Duration) -> Result<Option<RawMessage>, TransportError>;
}

/// # Summary
/// Opened inbound handle, owned exclusively by the listener.
///
/// # Invariants
/// - Dropping the handle releases every resource it holds.
pub enum Inbound {
    Socket(Box<dyn SocketReceiver>),
    Changes(ChangeStream),
}

/// # Summary
/// Source of raw packets for a session.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Human-readable endpoint description used in logs.
    fn name(&self) -> String;

    /// # Summary
    /// Opens a fresh inbound handle for one subscription period.
    ///
    /// # Returns
    /// The handle, or `Authentication`/`Connection` when the producer cannot be reached.
    async fn open(&self) -> Result<Inbound, TransportError>;
}
