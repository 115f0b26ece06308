use crate::result::entity::ResultKind;
use thiserror::Error;

/// # Summary
/// Failures of the backend ↔ unified result mapping.
///
/// # Invariants
/// - `KindMismatch` signals a contract violation by the caller and is never coerced away.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertError {
    // reverse mapping requested for a result of another kind
    #[error("Result is of kind {actual}, expected {expected}")]
    KindMismatch {
        expected: ResultKind,
        actual: ResultKind,
    },
    // chart point timestamp not representable
    #[error("Invalid timestamp {seconds} in series '{series}'")]
    InvalidTimestamp { series: String, seconds: i64 },
}
