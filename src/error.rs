//! Error types for the tracker
//!
//! Dirty input never ends up here: an unparseable date or an unknown name is
//! an expected outcome and is reported through `Option`/`bool` by the
//! reconciliation functions. These variants cover configuration mistakes,
//! storage failures and refused requests.

use thiserror::Error;

/// Result type used across the tracker
pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Error, Debug)]
pub enum TrackerError {
    /// Invalid configuration, such as a column layout without an author column
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot encoding or decoding error
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// The store write lock could not be taken within the configured wait
    #[error("Store is busy, try again")]
    Busy,

    /// Request data that cannot be stored, e.g. an unreadable date
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Presented credential does not match the identity
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Requested record not found
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<bincode::Error> for TrackerError {
    fn from(e: bincode::Error) -> Self {
        TrackerError::Snapshot(e.to_string())
    }
}
