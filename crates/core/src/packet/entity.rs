use crate::common::wire_enum;
use crate::order::entity::OrderEvent;
use crate::result::entity::{BacktestResult, LiveResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

wire_enum! {
    /// # Summary
    /// Kind discriminant carried in the `type` field of every packet.
    ///
    /// # Invariants
    /// - Codes match what the producer emits; names are matched case-insensitively.
    pub enum PacketType {
        AlgorithmNode = 1,
        BacktestResult = 5,
        LiveNode = 7,
        LiveResult = 8,
        AlgorithmStatus = 12,
        HandledError = 17,
        Log = 18,
        Debug = 19,
        OrderEvent = 20,
        AlgorithmNameUpdate = 45,
    }
}

wire_enum! {
    /// # Summary
    /// Lifecycle status of a remote algorithm.
    pub enum AlgorithmStatus {
        DeployError = 0,
        InQueue = 1,
        Running = 2,
        Stopped = 3,
        Liquidated = 4,
        Deleted = 5,
        Completed = 6,
        RuntimeError = 7,
        Invalid = 8,
        LoggingIn = 9,
        Initializing = 10,
        History = 11,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmStatusPacket {
    #[serde(alias = "algorithmID")]
    pub algorithm_id: String,
    #[serde(default)]
    pub project_id: i64,
    pub status: AlgorithmStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub channel_status: Option<String>,
}

/// # Summary
/// Descriptor of the live node hosting the algorithm.
///
/// # Invariants
/// - Only the algorithm identifier is interpreted; the rest is kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveNodePacket {
    #[serde(alias = "algorithmID", alias = "sDeployID")]
    pub algorithm_id: String,
    #[serde(default)]
    pub project_id: i64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmNodePacket {
    #[serde(alias = "algorithmID", alias = "sAlgorithmID")]
    pub algorithm_id: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmNameUpdatePacket {
    #[serde(alias = "algorithmID")]
    pub algorithm_id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveResultPacket {
    #[serde(default)]
    pub deploy_id: String,
    #[serde(default)]
    pub project_id: i64,
    #[serde(default)]
    pub results: LiveResult,
}

/// # Summary
/// Result snapshot of a backtest together with its completion ratio.
///
/// # Invariants
/// - `progress` lies in `[0, 1]`; `1` marks the final snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestResultPacket {
    #[serde(default)]
    pub backtest_id: String,
    #[serde(default)]
    pub project_id: i64,
    #[serde(default)]
    pub progress: Decimal,
    #[serde(default)]
    pub results: BacktestResult,
}

impl BacktestResultPacket {
    pub fn is_completed(&self) -> bool {
        self.progress == Decimal::ONE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEventPacket {
    #[serde(default, alias = "sAlgorithmID")]
    pub algorithm_id: String,
    #[serde(alias = "oOrderEvent")]
    pub event: OrderEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPacket {
    #[serde(default)]
    pub algorithm_id: String,
    #[serde(alias = "sMessage")]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugPacket {
    #[serde(default)]
    pub algorithm_id: String,
    #[serde(alias = "sMessage")]
    pub message: String,
    #[serde(default)]
    pub toast: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandledErrorPacket {
    #[serde(default)]
    pub algorithm_id: String,
    #[serde(alias = "sMessage")]
    pub message: String,
    #[serde(default)]
    pub stack_trace: Option<String>,
}

/// # Summary
/// One decoded event received from the producer.
///
/// # Invariants
/// - Immutable once decoded; packets are moved through the queue, never shared mutably.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    AlgorithmStatus(AlgorithmStatusPacket),
    LiveNode(LiveNodePacket),
    AlgorithmNameUpdate(AlgorithmNameUpdatePacket),
    AlgorithmNode(AlgorithmNodePacket),
    LiveResult(LiveResultPacket),
    BacktestResult(BacktestResultPacket),
    OrderEvent(OrderEventPacket),
    Log(LogPacket),
    Debug(DebugPacket),
    HandledError(HandledErrorPacket),
}

impl Packet {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::AlgorithmStatus(_) => PacketType::AlgorithmStatus,
            Packet::LiveNode(_) => PacketType::LiveNode,
            Packet::AlgorithmNameUpdate(_) => PacketType::AlgorithmNameUpdate,
            Packet::AlgorithmNode(_) => PacketType::AlgorithmNode,
            Packet::LiveResult(_) => PacketType::LiveResult,
            Packet::BacktestResult(_) => PacketType::BacktestResult,
            Packet::OrderEvent(_) => PacketType::OrderEvent,
            Packet::Log(_) => PacketType::Log,
            Packet::Debug(_) => PacketType::Debug,
            Packet::HandledError(_) => PacketType::HandledError,
        }
    }

    /// # Summary
    /// Algorithm identifier that may install the order-event decode rule.
    ///
    /// # Returns
    /// `Some` only for `AlgorithmNameUpdate` and `AlgorithmNode` packets with a non-empty id.
    pub fn announced_algorithm(&self) -> Option<&str> {
        let id = match self {
            Packet::AlgorithmNameUpdate(p) => p.algorithm_id.as_str(),
            Packet::AlgorithmNode(p) => p.algorithm_id.as_str(),
            _ => return None,
        };
        (!id.is_empty()).then_some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_type_by_code_and_name() {
        assert_eq!(PacketType::from_code(20), Some(PacketType::OrderEvent));
        assert_eq!(PacketType::from_name("livenode"), Some(PacketType::LiveNode));
        assert_eq!(PacketType::from_code(999), None);
        assert_eq!(PacketType::ALL.len(), 10);
    }

    #[test]
    fn status_packet_accepts_status_name() {
        let raw = r#"{"type":"AlgorithmStatus","algorithmId":"a1","status":"running","message":"ok"}"#;
        let packet: AlgorithmStatusPacket = serde_json::from_str(raw).unwrap();
        assert_eq!(packet.status, AlgorithmStatus::Running);
        assert_eq!(packet.project_id, 0);
    }

    #[test]
    fn announced_algorithm_ignores_other_kinds_and_empty_ids() {
        let update = Packet::AlgorithmNameUpdate(AlgorithmNameUpdatePacket {
            algorithm_id: "a1".into(),
            name: "Momentum".into(),
        });
        assert_eq!(update.announced_algorithm(), Some("a1"));

        let empty = Packet::AlgorithmNode(AlgorithmNodePacket {
            algorithm_id: String::new(),
            extra: Default::default(),
        });
        assert_eq!(empty.announced_algorithm(), None);

        let log = Packet::Log(LogPacket {
            algorithm_id: "a1".into(),
            message: "hi".into(),
        });
        assert_eq!(log.announced_algorithm(), None);
    }
}
