use thiserror::Error;

/// # Summary
/// Failures turning a raw payload into a `Packet`.
///
/// # Invariants
/// - Always recoverable: callers log and drop the offending message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    // payload is not valid UTF-8
    #[error("Payload is not valid UTF-8: {0}")]
    Encoding(String),
    // not JSON, or the body does not match the declared kind
    #[error("Malformed {kind} payload: {reason}")]
    Malformed { kind: String, reason: String },
    // missing or unrecognised `type` discriminant
    #[error("Unknown packet type: {0}")]
    UnknownType(String),
    #[error("Order event received before any algorithm identifier was observed")]
    OrderEventRuleMissing,
    #[error("Order event for algorithm {actual} does not match session algorithm {expected}")]
    AlgorithmMismatch { expected: String, actual: String },
}
