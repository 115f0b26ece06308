use vigil_core::packet::entity::LiveResultPacket;

/// # Summary
/// Reconciles partial live snapshots into one.
///
/// # Invariants
/// - `snapshots` must be ordered newest to oldest.
///
/// # Logic
/// 1. The newest snapshot is the base of the result.
/// 2. Cash and holdings are each adopted from the newest snapshot where they are non-empty.
/// 3. Scanning stops as soon as both are non-empty; older snapshots are never pulled.
///
/// # Returns
/// The merged snapshot, even when cash and holdings both stay empty; `None` for an empty input.
pub fn merge_live_results<I>(snapshots: I) -> Option<LiveResultPacket>
where
    I: IntoIterator<Item = LiveResultPacket>,
{
    let mut snapshots = snapshots.into_iter();
    let mut merged = snapshots.next()?;

    while merged.results.cash.is_empty() || merged.results.holdings.is_empty() {
        let Some(older) = snapshots.next() else { break };
        if merged.results.cash.is_empty() && !older.results.cash.is_empty() {
            merged.results.cash = older.results.cash;
        }
        if merged.results.holdings.is_empty() && !older.results.holdings.is_empty() {
            merged.results.holdings = older.results.holdings;
        }
    }
    Some(merged)
}
