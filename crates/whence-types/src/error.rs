//! Error types for record model validation.

use thiserror::Error;

use crate::RecordId;

/// Violations of the record graph invariants detected while resolving drafts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A draft referenced a stored record that is not strictly older than itself.
    #[error("record {record} references {reference}, which is not older than itself")]
    ForwardReference { record: RecordId, reference: RecordId },

    /// A draft referenced a batch entry at or after its own position.
    #[error("batch entry {index} references batch entry {reference}, which does not precede it")]
    BatchReference { index: usize, reference: usize },
}
