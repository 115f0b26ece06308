use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistoryError {
    // backing store could not be queried
    #[error("History backend error: {0}")]
    Backend(String),
    #[error("History unavailable: {0}")]
    Unavailable(String),
}
