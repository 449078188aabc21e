//! Mapping diagnostics.
//!
//! The mapper never aborts. When the assigned string and the serialized form
//! cannot be aligned it reports to a [`DiagnosticSink`] and carries on with
//! zero correction for the span.

use parking_lot::Mutex;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    ReconciliationMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingDiagnostic {
    pub kind: DiagnosticKind,
    /// Position in the serialized markup where alignment failed.
    pub serialized_pos: usize,
    /// Corresponding position the mapper assumed in the assigned string.
    pub assigned_pos: i64,
    pub message: String,
}

impl MappingDiagnostic {
    pub fn mismatch(serialized_pos: usize, assigned_pos: i64, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::ReconciliationMismatch,
            serialized_pos,
            assigned_pos,
            message: message.into(),
        }
    }
}

pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: MappingDiagnostic);
}

/// Logs diagnostics as warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: MappingDiagnostic) {
        warn!(
            serialized_pos = diagnostic.serialized_pos,
            assigned_pos = diagnostic.assigned_pos,
            "markup mapping: {}",
            diagnostic.message
        );
    }
}

/// Keeps diagnostics in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<MappingDiagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<MappingDiagnostic> {
        std::mem::take(&mut *self.diagnostics.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.lock().is_empty()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: MappingDiagnostic) {
        self.diagnostics.lock().push(diagnostic);
    }
}
