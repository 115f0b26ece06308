use crate::order::entity::OrderEvent;
use crate::packet::entity::{AlgorithmStatusPacket, LiveNodePacket};
use crate::session::entity::{LogKind, ResultContext, SessionState};
use crate::session::error::SessionError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// # Summary
/// Consumer of everything a session delivers.
///
/// # Invariants
/// - Calls are awaited one at a time by the drainer, in queue order; an implementation
///   never observes two concurrent calls from the same session.
/// - `handle_state_changed` and `handle_fault` may also be invoked from the session
///   façade or the listener task.
#[async_trait]
pub trait SessionHandler: Send + Sync {
    async fn handle_algorithm_status(&self, packet: AlgorithmStatusPacket);

    async fn handle_live_node(&self, packet: LiveNodePacket);

    /// # Summary
    /// Receives a converted live or backtest result.
    ///
    /// # Arguments
    /// * `context`: session name, unified result and (backtest only) progress.
    async fn handle_result(&self, context: ResultContext);

    /// # Summary
    /// Receives a log, debug or error line forwarded by the producer.
    ///
    /// # Arguments
    /// * `timestamp`: UTC time the line was dispatched.
    /// * `text`: message body.
    /// * `kind`: severity.
    async fn handle_log_message(&self, timestamp: DateTime<Utc>, text: String, kind: LogKind);

    async fn handle_order_event(&self, event: OrderEvent);

    async fn handle_state_changed(&self, state: SessionState);

    /// # Summary
    /// Receives a failure that ended a subscription period.
    ///
    /// # Logic
    /// 1. The default implementation only records the failure.
    async fn handle_fault(&self, error: &SessionError) {
        tracing::error!("Session fault: {}", error);
    }
}
