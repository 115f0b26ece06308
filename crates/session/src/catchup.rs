use tracing::{debug, info, warn};
use vigil_core::history::port::{PacketHistory, StoredPacket};
use vigil_core::packet::entity::{Packet, PacketType};
use vigil_core::session::error::SessionError;

use crate::merge::merge_live_results;
use crate::session::Session;

impl Session {
    /// # Summary
    /// Bootstraps the session from recorded packets.
    ///
    /// # Logic
    /// 1. Enqueues the latest `LiveNode` packet, if any.
    /// 2. Enqueues the latest `AlgorithmStatus` packet, if any.
    /// 3. Merges up to `catch_up_limit` recent `LiveResult` packets, newest first, and
    ///    enqueues the merged snapshot. Undecodable snapshots are skipped.
    /// 4. Stops quietly between steps once the session is disposed.
    ///
    /// # Arguments
    /// * `history`: journal to read from.
    ///
    /// # Returns
    /// `History` when the journal cannot be read, `Disposed` when called after `dispose`.
    pub async fn load_recent(&self, history: &dyn PacketHistory) -> Result<(), SessionError> {
        let inner = &self.inner;
        if inner.lifetime.is_cancelled() {
            return Err(SessionError::Disposed);
        }

        for packet_type in [PacketType::LiveNode, PacketType::AlgorithmStatus] {
            if let Some(stored) = history.latest(packet_type).await? {
                if inner.lifetime.is_cancelled() {
                    return Ok(());
                }
                self.enqueue_stored(&stored);
            }
        }

        let recent = history
            .recent(PacketType::LiveResult, inner.config.catch_up_limit)
            .await?;
        if inner.lifetime.is_cancelled() {
            return Ok(());
        }
        info!(session = %inner.name, snapshots = recent.len(), "Merging recent live results");

        let decoded = recent.iter().filter_map(|stored| {
            match inner.decoder.decode(&stored.message, PacketType::LiveResult) {
                Ok(Packet::LiveResult(packet)) => Some(packet),
                Ok(other) => {
                    warn!(kind = %other.packet_type(), "Unexpected packet in live result history");
                    None
                }
                Err(e) => {
                    warn!(error = %e, "Skipping undecodable live result");
                    None
                }
            }
        });
        if let Some(merged) = merge_live_results(decoded) {
            self.enqueue(Packet::LiveResult(merged));
        }
        Ok(())
    }

    fn enqueue_stored(&self, stored: &StoredPacket) {
        match self.inner.decoder.decode(&stored.message, stored.packet_type) {
            Ok(packet) => self.enqueue(packet),
            Err(e) => warn!(kind = %stored.packet_type, error = %e, "Skipping undecodable history packet"),
        }
    }

    fn enqueue(&self, packet: Packet) {
        let kind = packet.packet_type();
        match self.inner.queue.push(packet) {
            Ok(()) => debug!(%kind, "History packet queued"),
            Err(e) => warn!(%kind, error = %e, "History packet not queued"),
        }
    }
}
