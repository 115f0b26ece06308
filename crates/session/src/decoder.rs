use std::str::FromStr;
use std::sync::OnceLock;
use tracing::{debug, info};
use vigil_core::packet::entity::{OrderEventPacket, Packet, PacketType};
use vigil_core::packet::error::DecodeError;

/// # Summary
/// Algorithm-specific rule applied to every order event once an algorithm is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderEventRule {
    algorithm_id: String,
}

impl OrderEventRule {
    pub fn algorithm_id(&self) -> &str {
        &self.algorithm_id
    }

    /// # Summary
    /// Validates the event's algorithm and stamps it with the composite id.
    ///
    /// # Logic
    /// 1. An event announcing another algorithm is rejected.
    /// 2. An event without an algorithm identifier inherits the rule's.
    fn apply(&self, mut packet: OrderEventPacket) -> Result<OrderEventPacket, DecodeError> {
        if !packet.algorithm_id.is_empty() && packet.algorithm_id != self.algorithm_id {
            return Err(DecodeError::AlgorithmMismatch {
                expected: self.algorithm_id.clone(),
                actual: packet.algorithm_id,
            });
        }
        packet.algorithm_id = self.algorithm_id.clone();
        packet.event.stamp(&self.algorithm_id);
        Ok(packet)
    }
}

/// # Summary
/// Turns raw payloads into typed packets.
///
/// # Invariants
/// - The order-event rule is installed at most once, from the first `AlgorithmNameUpdate`
///   or `AlgorithmNode` carrying an algorithm identifier. Concurrent installers race
///   harmlessly; the first one wins.
/// - Order events cannot be decoded before the rule exists.
#[derive(Debug, Default)]
pub struct PacketDecoder {
    rule: OnceLock<OrderEventRule>,
}

impl PacketDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Algorithm the order-event rule was installed for, if any.
    pub fn installed_algorithm(&self) -> Option<&str> {
        self.rule.get().map(OrderEventRule::algorithm_id)
    }

    /// # Summary
    /// Decodes one socket frame.
    ///
    /// # Logic
    /// 1. The frame must be UTF-8.
    /// 2. The kind is read from the payload's own `type` field.
    pub fn decode_frame(&self, frame: &[u8]) -> Result<Packet, DecodeError> {
        let text = std::str::from_utf8(frame).map_err(|e| DecodeError::Encoding(e.to_string()))?;
        self.decode_tagged(text)
    }

    /// Decodes a payload whose kind is given by its `type` field (name or code).
    pub fn decode_tagged(&self, payload: &str) -> Result<Packet, DecodeError> {
        let value = parse(payload, "packet")?;
        let packet_type = match value.get("type") {
            Some(serde_json::Value::String(name)) => parse_type(name)?,
            Some(serde_json::Value::Number(code)) => code
                .as_i64()
                .and_then(PacketType::from_code)
                .ok_or_else(|| DecodeError::UnknownType(code.to_string()))?,
            Some(other) => return Err(DecodeError::UnknownType(other.to_string())),
            None => return Err(DecodeError::UnknownType("<missing>".to_string())),
        };
        self.decode_value(value, packet_type)
    }

    /// Decodes a payload whose kind is declared out of band, as change documents do.
    pub fn decode_declared(&self, payload: &str, type_name: &str) -> Result<Packet, DecodeError> {
        let packet_type = parse_type(type_name)?;
        self.decode(payload, packet_type)
    }

    /// # Summary
    /// Decodes a payload of a known kind.
    ///
    /// # Arguments
    /// * `payload`: JSON body of the packet.
    /// * `packet_type`: kind the body is decoded as.
    ///
    /// # Returns
    /// Exactly one packet, or the reason it could not be produced.
    pub fn decode(&self, payload: &str, packet_type: PacketType) -> Result<Packet, DecodeError> {
        let value = parse(payload, packet_type.name())?;
        self.decode_value(value, packet_type)
    }

    fn decode_value(&self, mut value: serde_json::Value, packet_type: PacketType) -> Result<Packet, DecodeError> {
        if let Some(body) = value.as_object_mut() {
            body.remove("type");
        }

        let packet = match packet_type {
            PacketType::AlgorithmStatus => Packet::AlgorithmStatus(body(value, packet_type)?),
            PacketType::LiveNode => Packet::LiveNode(body(value, packet_type)?),
            PacketType::AlgorithmNameUpdate => Packet::AlgorithmNameUpdate(body(value, packet_type)?),
            PacketType::AlgorithmNode => Packet::AlgorithmNode(body(value, packet_type)?),
            PacketType::LiveResult => Packet::LiveResult(body(value, packet_type)?),
            PacketType::BacktestResult => Packet::BacktestResult(body(value, packet_type)?),
            PacketType::Log => Packet::Log(body(value, packet_type)?),
            PacketType::Debug => Packet::Debug(body(value, packet_type)?),
            PacketType::HandledError => Packet::HandledError(body(value, packet_type)?),
            PacketType::OrderEvent => {
                let rule = self.rule.get().ok_or(DecodeError::OrderEventRuleMissing)?;
                Packet::OrderEvent(rule.apply(body(value, packet_type)?)?)
            }
        };

        if let Some(algorithm_id) = packet.announced_algorithm() {
            self.install_rule(algorithm_id);
        }
        Ok(packet)
    }

    fn install_rule(&self, algorithm_id: &str) {
        let rule = OrderEventRule {
            algorithm_id: algorithm_id.to_string(),
        };
        match self.rule.set(rule) {
            Ok(()) => info!(algorithm_id, "Order event decoding enabled"),
            Err(_) => debug!(algorithm_id, "Order event rule already installed"),
        }
    }
}

fn parse(payload: &str, kind: &str) -> Result<serde_json::Value, DecodeError> {
    serde_json::from_str(payload).map_err(|e| DecodeError::Malformed {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}

fn parse_type(token: &str) -> Result<PacketType, DecodeError> {
    PacketType::from_str(token).map_err(|_| DecodeError::UnknownType(token.to_string()))
}

fn body<T: serde::de::DeserializeOwned>(value: serde_json::Value, packet_type: PacketType) -> Result<T, DecodeError> {
    serde_json::from_value(value).map_err(|e| DecodeError::Malformed {
        kind: packet_type.name().to_string(),
        reason: e.to_string(),
    })
}
