use crate::result::entity::AlgorithmResult;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// # Summary
/// Subscription state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SessionState {
    #[default]
    Unsubscribed,
    Subscribed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Unsubscribed => write!(f, "Unsubscribed"),
            SessionState::Subscribed => write!(f, "Subscribed"),
        }
    }
}

/// Severity of a forwarded log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogKind {
    Log,
    Debug,
    Error,
}

/// # Summary
/// A converted result as delivered to the handler.
///
/// # Invariants
/// - `name` is the name of the session that produced it.
/// - `progress` is `Some` only for backtest results and lies in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultContext {
    pub name: String,
    pub result: AlgorithmResult,
    pub progress: Option<Decimal>,
}
