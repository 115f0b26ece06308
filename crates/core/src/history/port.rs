use crate::history::error::HistoryError;
use crate::packet::entity::PacketType;
use async_trait::async_trait;

/// # Summary
/// A journalled packet: its kind and raw JSON payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPacket {
    pub packet_type: PacketType,
    pub message: String,
}

/// # Summary
/// Read access to previously recorded packets, used to bootstrap a session.
#[async_trait]
pub trait PacketHistory: Send + Sync {
    /// Newest packet of the given kind, if any.
    async fn latest(&self, packet_type: PacketType) -> Result<Option<StoredPacket>, HistoryError>;

    /// # Summary
    /// Up to `limit` packets of the given kind.
    ///
    /// # Returns
    /// Newest first.
    async fn recent(&self, packet_type: PacketType, limit: usize) -> Result<Vec<StoredPacket>, HistoryError>;
}
