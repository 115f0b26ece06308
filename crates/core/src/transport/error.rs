use thiserror::Error;

/// # Summary
/// Failures of the inbound transport.
///
/// # Invariants
/// - Every variant is fatal to the current subscription period.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Connection error: {0}")]
    Connection(String),
    // credentials rejected by the producer
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Timed out: {0}")]
    Timeout(String),
    // unexpected frame or document shape at the transport level
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Transport closed")]
    Closed,
}
