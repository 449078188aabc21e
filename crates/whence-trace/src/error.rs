//! Traversal error types.

use std::time::Duration;

use thiserror::Error;
use whence_store::StoreError;
use whence_types::RecordId;

use crate::trace::Step;

/// Errors that end a traversal query.
///
/// Failures raised mid-walk carry the steps taken up to and including the
/// one that failed. An unsupported operation is not an error: it ends the
/// trace early with [`TraceEnd::Unsupported`](crate::TraceEnd::Unsupported).
#[derive(Error, Debug)]
pub enum TraversalError {
    /// The record was never allocated.
    #[error("record {id} not found")]
    LogNotFound { id: RecordId, steps: Vec<Step> },

    /// The record stayed not-yet-available for the whole wait.
    #[error("record {id} not available after {waited:?}")]
    LogNotFoundTimeout {
        id: RecordId,
        waited: Duration,
        steps: Vec<Step>,
    },

    /// A step revisited an earlier `(id, char_index)` pair.
    #[error("traversal cycle at {step}")]
    TraversalCycleDetected { step: Step, steps: Vec<Step> },

    #[error("traversal exceeded {max_steps} steps")]
    StepLimitExceeded { max_steps: usize, steps: Vec<Step> },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl TraversalError {
    /// Steps walked before the failure. Empty for store errors and for
    /// lookups outside a traversal.
    pub fn steps(&self) -> &[Step] {
        match self {
            Self::LogNotFound { steps, .. }
            | Self::LogNotFoundTimeout { steps, .. }
            | Self::TraversalCycleDetected { steps, .. }
            | Self::StepLimitExceeded { steps, .. } => steps,
            Self::Store(_) => &[],
        }
    }
}

pub type TraversalResult<T> = Result<T, TraversalError>;
