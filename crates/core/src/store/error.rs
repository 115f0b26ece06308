use thiserror::Error;

/// # Summary
/// Failures of the packet journal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    // database or collection name that cannot be used as a file or table name
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Initialization error: {0}")]
    InitError(String),
}
