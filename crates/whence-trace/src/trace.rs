//! Traversal steps and results.

use std::fmt;

use serde::{Deserialize, Serialize};
use whence_types::{OperationKind, RecordId};

/// A position inside a logged value: character `char_index` of the value
/// produced by record `id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Step {
    pub id: RecordId,
    pub char_index: usize,
}

impl Step {
    pub fn new(id: RecordId, char_index: usize) -> Self {
        Self { id, char_index }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.char_index)
    }
}

/// Why a trace stopped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "end", rename_all = "snake_case")]
pub enum TraceEnd {
    /// The last step is where the character was first introduced.
    Origin,
    /// The character was generated by the operation itself, not copied from
    /// an operand.
    Synthesized,
    /// The next operand had no producer.
    Untracked { operand: String },
    /// No rule covers this record.
    Unsupported { kind: OperationKind, detail: String },
    /// Optimistic mode: `missing` never became available.
    Incomplete { missing: RecordId },
}

impl TraceEnd {
    pub fn is_complete(&self) -> bool {
        matches!(self, TraceEnd::Origin | TraceEnd::Synthesized)
    }
}

/// Ordered steps from the queried value back to the origin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    pub steps: Vec<Step>,
    pub end: TraceEnd,
}

impl Trace {
    /// The final step reached.
    pub fn last(&self) -> Option<Step> {
        self.steps.last().copied()
    }
}
