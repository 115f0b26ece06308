use crate::packet::entity::PacketType;
use crate::store::error::StoreError;
use async_trait::async_trait;

/// # Summary
/// Append-only record of packets as the producer emitted them.
///
/// # Invariants
/// - Row ids grow monotonically; readers order by them.
#[async_trait]
pub trait PacketJournal: Send + Sync {
    /// # Summary
    /// Records one packet.
    ///
    /// # Returns
    /// The id assigned to the new row.
    async fn append(&self, packet_type: PacketType, message: &str) -> Result<i64, StoreError>;
}
