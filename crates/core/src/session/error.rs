use crate::history::error::HistoryError;
use crate::transport::error::TransportError;
use thiserror::Error;

/// # Summary
/// Errors surfaced to the owner of a session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    // the listener lost its transport; the period has ended
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),
    #[error("History load failed: {0}")]
    History(#[from] HistoryError),
    #[error("Invalid session configuration: {0}")]
    Config(String),
    // no async runtime available to spawn the loops
    #[error("Runtime unavailable: {0}")]
    Runtime(String),
    #[error("Session has been disposed")]
    Disposed,
}
