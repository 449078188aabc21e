//! Store error types.

use thiserror::Error;
use whence_types::{ModelError, RecordId};

/// Errors surfaced by record store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A draft in the batch broke the back-reference invariant. Nothing from
    /// the batch was stored.
    #[error("invalid reference in batch: {0}")]
    InvalidReference(#[from] ModelError),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored row does not match the record it claims to hold.
    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: RecordId, reason: String },
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
