use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vigil_core::packet::entity::Packet;
use vigil_core::packet::error::DecodeError;
use vigil_core::transport::error::TransportError;
use vigil_core::transport::port::{ChangeStream, Inbound, SocketReceiver, Transport};

use crate::decoder::PacketDecoder;
use crate::queue::PacketQueue;

/// # Summary
/// Receive loop of one subscription period.
///
/// # Invariants
/// - Owns the inbound handle; it is dropped on every exit path.
/// - Never blocks on the queue.
pub(crate) struct Listener {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) decoder: Arc<PacketDecoder>,
    pub(crate) queue: Arc<PacketQueue>,
    pub(crate) cancel: CancellationToken,
    pub(crate) poll_timeout: Duration,
}

impl Listener {
    /// # Summary
    /// Opens the transport and forwards decoded packets until cancelled.
    ///
    /// # Returns
    /// `Ok` on cancellation or queue shutdown, `Err` on a fatal transport failure.
    pub(crate) async fn run(self) -> Result<(), TransportError> {
        let inbound = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(()),
            inbound = self.transport.open() => inbound?,
        };
        info!(transport = %self.transport.name(), "Listener started");

        let outcome = match inbound {
            Inbound::Socket(receiver) => self.poll_socket(receiver).await,
            Inbound::Changes(stream) => self.consume_changes(stream).await,
        };
        info!(transport = %self.transport.name(), "Listener stopped");
        outcome
    }

    async fn poll_socket(&self, mut receiver: Box<dyn SocketReceiver>) -> Result<(), TransportError> {
        loop {
            let received = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(()),
                received = receiver.try_receive(self.poll_timeout) => received?,
            };
            let Some(message) = received else {
                continue;
            };
            let [frame] = message.frames.as_slice() else {
                warn!(frames = message.frames.len(), "Skipping message with unexpected frame count");
                continue;
            };
            if !self.forward(self.decoder.decode_frame(frame)) {
                return Ok(());
            }
        }
    }

    async fn consume_changes(&self, mut stream: ChangeStream) -> Result<(), TransportError> {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(()),
                next = stream.next() => next,
            };
            match next {
                Some(Ok(document)) => {
                    let decoded = self.decoder.decode_declared(&document.message, &document.packet_type);
                    if !self.forward(decoded) {
                        return Ok(());
                    }
                }
                Some(Err(e)) => return Err(e),
                None => return Err(TransportError::Closed),
            }
        }
    }

    // false once the queue is shut down
    fn forward(&self, decoded: Result<Packet, DecodeError>) -> bool {
        match decoded {
            Ok(packet) => {
                let kind = packet.packet_type();
                match self.queue.push(packet) {
                    Ok(()) => {
                        debug!(%kind, "Packet queued");
                        true
                    }
                    Err(_) => {
                        debug!("Queue closed, listener stopping");
                        false
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Dropping undecodable packet");
                true
            }
        }
    }
}
