use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use vigil_core::packet::entity::Packet;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    // queue was shut down; producers and consumers stop quietly
    #[error("Queue closed")]
    Closed,
    #[error("Wait cancelled")]
    Cancelled,
}

/// # Summary
/// Unbounded FIFO shared by the listener (producer) and the drainer (consumer).
///
/// # Invariants
/// - `push` never blocks.
/// - Items come out in insertion order.
/// - After `shutdown` every `push` and `pop` fails with `QueueError::Closed`.
pub struct PacketQueue {
    tx: mpsc::UnboundedSender<Packet>,
    rx: Mutex<mpsc::UnboundedReceiver<Packet>>,
    closed: CancellationToken,
}

impl Default for PacketQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
            closed: CancellationToken::new(),
        }
    }

    pub fn push(&self, packet: Packet) -> Result<(), QueueError> {
        if self.closed.is_cancelled() {
            return Err(QueueError::Closed);
        }
        self.tx.send(packet).map_err(|_| QueueError::Closed)
    }

    /// # Summary
    /// Waits for the next packet.
    ///
    /// # Logic
    /// 1. Cancellation wins over a ready packet.
    /// 2. Shutdown wins over a ready packet.
    /// 3. Otherwise returns the oldest packet, waiting if none is available.
    pub async fn pop(&self, cancel: &CancellationToken) -> Result<Packet, QueueError> {
        let mut rx = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(QueueError::Cancelled),
            _ = self.closed.cancelled() => return Err(QueueError::Closed),
            rx = self.rx.lock() => rx,
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(QueueError::Cancelled),
            _ = self.closed.cancelled() => Err(QueueError::Closed),
            item = rx.recv() => item.ok_or(QueueError::Closed),
        }
    }

    /// Closes the queue for good and wakes every waiting consumer.
    pub fn shutdown(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}
