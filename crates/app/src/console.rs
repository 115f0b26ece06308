use rust_decimal::Decimal;
use vigil_core::session::entity::LogKind;
use vigil_session::SessionEvent;

/// # Summary
/// Renders one session event as a console line.
///
/// # Returns
/// `None` for events that have no console representation.
pub fn render(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::StateChanged(state) => Some(format!("[session] {}", state)),
        SessionEvent::Faulted(error) => Some(format!("[fault] {}", error)),
        SessionEvent::AlgorithmStatus(packet) => Some(format!(
            "[status] {} {}{}",
            packet.algorithm_id,
            packet.status,
            if packet.message.is_empty() {
                String::new()
            } else {
                format!(" ({})", packet.message)
            }
        )),
        SessionEvent::LiveNode(packet) => Some(format!("[node] {}", packet.algorithm_id)),
        SessionEvent::Log { timestamp, text, kind } => {
            let tag = match kind {
                LogKind::Log => "log",
                LogKind::Debug => "debug",
                LogKind::Error => "error",
            };
            Some(format!("{} [{}] {}", timestamp.format("%H:%M:%S"), tag, text))
        }
        SessionEvent::OrderEvent(event) => Some(format!(
            "[order] #{} {} {} {} @ {} ({})",
            event.order_id, event.symbol, event.direction, event.fill_quantity, event.fill_price, event.status
        )),
        SessionEvent::Result(context) => {
            let result = &context.result;
            let progress = context
                .progress
                .map(|p| format!(" {}%", (p * Decimal::ONE_HUNDRED).round_dp(1)))
                .unwrap_or_default();
            let equity = result
                .statistics
                .get("Equity")
                .or_else(|| result.runtime_statistics.get("Equity"))
                .map(|e| format!(" equity {}", e))
                .unwrap_or_default();
            Some(format!(
                "[result] {} {}{}{} charts={} orders={}",
                context.name,
                result.kind(),
                progress,
                equity,
                result.charts.len(),
                result.orders.len()
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use vigil_core::result::entity::{AlgorithmResult, ResultKind};
    use vigil_core::session::entity::{ResultContext, SessionState};

    #[test]
    fn renders_log_lines_with_time_and_kind() {
        let event = SessionEvent::Log {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 5).unwrap(),
            text: "warming up".to_string(),
            kind: LogKind::Debug,
        };
        assert_eq!(render(&event).unwrap(), "09:30:05 [debug] warming up");
    }

    #[test]
    fn renders_backtest_progress() {
        let mut result = AlgorithmResult::new(ResultKind::Backtest);
        result.runtime_statistics.insert("Equity".to_string(), "$101,200.00".to_string());
        let event = SessionEvent::Result(ResultContext {
            name: "localhost:33333".to_string(),
            result,
            progress: Some(dec!(0.425)),
        });
        assert_eq!(
            render(&event).unwrap(),
            "[result] localhost:33333 Backtest 42.5% equity $101,200.00 charts=0 orders=0"
        );
    }

    #[test]
    fn renders_state_changes() {
        let event = SessionEvent::StateChanged(SessionState::Unsubscribed);
        assert_eq!(render(&event).unwrap(), "[session] Unsubscribed");
    }
}
