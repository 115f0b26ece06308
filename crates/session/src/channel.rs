use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::debug;
use vigil_core::order::entity::OrderEvent;
use vigil_core::packet::entity::{AlgorithmStatusPacket, LiveNodePacket};
use vigil_core::session::entity::{LogKind, ResultContext, SessionState};
use vigil_core::session::error::SessionError;
use vigil_core::session::port::SessionHandler;

/// # Summary
/// Typed command describing one handler call.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    AlgorithmStatus(AlgorithmStatusPacket),
    LiveNode(LiveNodePacket),
    Result(ResultContext),
    Log {
        timestamp: DateTime<Utc>,
        text: String,
        kind: LogKind,
    },
    OrderEvent(OrderEvent),
    StateChanged(SessionState),
    Faulted(SessionError),
}

/// # Summary
/// Handler that forwards every call to whichever task owns the receiving end.
///
/// # Invariants
/// - Events arrive in the order the session produced them.
/// - Sending never blocks; a dropped receiver only discards events.
pub struct ChannelHandler {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelHandler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: SessionEvent) {
        if self.tx.send(event).is_err() {
            debug!("Session event receiver dropped, discarding event");
        }
    }
}

#[async_trait]
impl SessionHandler for ChannelHandler {
    async fn handle_algorithm_status(&self, packet: AlgorithmStatusPacket) {
        self.send(SessionEvent::AlgorithmStatus(packet));
    }

    async fn handle_live_node(&self, packet: LiveNodePacket) {
        self.send(SessionEvent::LiveNode(packet));
    }

    async fn handle_result(&self, context: ResultContext) {
        self.send(SessionEvent::Result(context));
    }

    async fn handle_log_message(&self, timestamp: DateTime<Utc>, text: String, kind: LogKind) {
        self.send(SessionEvent::Log { timestamp, text, kind });
    }

    async fn handle_order_event(&self, event: OrderEvent) {
        self.send(SessionEvent::OrderEvent(event));
    }

    async fn handle_state_changed(&self, state: SessionState) {
        self.send(SessionEvent::StateChanged(state));
    }

    async fn handle_fault(&self, error: &SessionError) {
        self.send(SessionEvent::Faulted(error.clone()));
    }
}
