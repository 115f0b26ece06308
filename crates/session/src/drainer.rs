use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vigil_core::common::time::TimeProvider;
use vigil_core::packet::entity::Packet;
use vigil_core::session::entity::{LogKind, ResultContext};
use vigil_core::session::port::SessionHandler;

use crate::convert::{from_backtest_result, from_live_result};
use crate::queue::{PacketQueue, QueueError};
use crate::session::SessionInner;

/// # Summary
/// Dispatch loop of one subscription period.
///
/// # Invariants
/// - One packet is dispatched at a time, in queue order.
/// - Every handler call is awaited before the next pop.
/// - Pop and dispatch happen under the session-wide turn lock, so a drainer of an
///   ended period finishes its in-flight packet before the next period's drainer pops.
pub(crate) struct Drainer {
    pub(crate) name: String,
    pub(crate) queue: Arc<PacketQueue>,
    pub(crate) handler: Arc<dyn SessionHandler>,
    pub(crate) clock: Arc<dyn TimeProvider>,
    pub(crate) close_after_completed: bool,
    pub(crate) cancel: CancellationToken,
    // shared by the drainers of every period
    pub(crate) turn: Arc<Mutex<()>>,
    pub(crate) session: Weak<SessionInner>,
    pub(crate) period: u64,
}

impl Drainer {
    pub(crate) async fn run(self) {
        info!(session = %self.name, period = self.period, "Drainer started");
        loop {
            let _turn = self.turn.lock().await;
            match self.queue.pop(&self.cancel).await {
                Ok(packet) => self.dispatch(packet).await,
                Err(QueueError::Cancelled) => break,
                Err(QueueError::Closed) => {
                    debug!("Queue closed, drainer stopping");
                    break;
                }
            }
        }
        info!(session = %self.name, period = self.period, "Drainer stopped");
    }

    /// # Summary
    /// Routes one packet to the handler.
    ///
    /// # Logic
    /// 1. Status, node and order events go to their dedicated handler methods.
    /// 2. Log, debug and error lines are stamped with the current time.
    /// 3. Results are converted; a failed conversion drops the packet.
    /// 4. A completed backtest ends the period when configured, after the handler returned.
    async fn dispatch(&self, packet: Packet) {
        match packet {
            Packet::AlgorithmStatus(p) => self.handler.handle_algorithm_status(p).await,
            Packet::LiveNode(p) => self.handler.handle_live_node(p).await,
            Packet::OrderEvent(p) => self.handler.handle_order_event(p.event).await,
            Packet::Log(p) => self.log(p.message, LogKind::Log).await,
            Packet::Debug(p) => self.log(p.message, LogKind::Debug).await,
            Packet::HandledError(p) => {
                let text = match p.stack_trace {
                    Some(trace) if !trace.is_empty() => format!("{}\n{}", p.message, trace),
                    _ => p.message,
                };
                self.log(text, LogKind::Error).await
            }
            Packet::LiveResult(p) => match from_live_result(p.results) {
                Ok(result) => {
                    let context = ResultContext {
                        name: self.name.clone(),
                        result,
                        progress: None,
                    };
                    self.handler.handle_result(context).await;
                }
                Err(e) => warn!(error = %e, "Dropping live result"),
            },
            Packet::BacktestResult(p) => {
                let completed = p.is_completed();
                match from_backtest_result(p.results) {
                    Ok(result) => {
                        let context = ResultContext {
                            name: self.name.clone(),
                            result,
                            progress: Some(p.progress),
                        };
                        self.handler.handle_result(context).await;
                    }
                    Err(e) => {
                        warn!(error = %e, "Dropping backtest result");
                        return;
                    }
                }
                if completed && self.close_after_completed {
                    info!(session = %self.name, "Backtest completed, closing session");
                    if let Some(session) = self.session.upgrade() {
                        session.end_period(self.period).await;
                    }
                }
            }
            Packet::AlgorithmNameUpdate(p) => {
                debug!(algorithm_id = %p.algorithm_id, name = %p.name, "Algorithm name update")
            }
            Packet::AlgorithmNode(p) => debug!(algorithm_id = %p.algorithm_id, "Algorithm node"),
        }
    }

    async fn log(&self, text: String, kind: LogKind) {
        self.handler.handle_log_message(self.clock.now(), text, kind).await;
    }
}
