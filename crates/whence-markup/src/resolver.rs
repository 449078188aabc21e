//! Markup character resolver.
//!
//! Given origin records for a piece of serialized markup, finds the span
//! containing a character and translates the position into the assigned
//! string's coordinates. The result is a valid traversal start.

use serde::{Deserialize, Serialize};
use whence_types::{OriginRecord, RecordId, char_len};

use crate::dom::{Fragment, NodeId};
use crate::mapper::MappedOrigin;
use crate::serialize::inner_html;

/// A serialized position traced to its assigned string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedOrigin {
    pub origin: OriginRecord,
    /// Position inside `origin.value`.
    pub char_index: usize,
}

impl ResolvedOrigin {
    pub fn tracking(&self) -> Option<RecordId> {
        self.origin.tracking
    }
}

/// Origin spans sorted by serialized start, ready for lookups.
#[derive(Clone, Debug, Default)]
pub struct MarkupMapping {
    spans: Vec<OriginRecord>,
}

impl MarkupMapping {
    /// Zero-length spans are dropped; they never contain a character.
    pub fn new(origins: impl IntoIterator<Item = OriginRecord>) -> Self {
        let mut spans: Vec<OriginRecord> = origins
            .into_iter()
            .filter(|o| o.serialized_len > 0)
            .collect();
        spans.sort_by_key(|o| o.serialized_start);
        Self { spans }
    }

    pub fn from_mapped(mapped: &[MappedOrigin]) -> Self {
        Self::new(mapped.iter().map(|m| m.origin.clone()))
    }

    pub fn spans(&self) -> &[OriginRecord] {
        &self.spans
    }

    /// Resolve serialized position `idx`. `None` when no span covers it.
    pub fn origin_at_char_index(&self, idx: usize) -> Option<ResolvedOrigin> {
        let after = self.spans.partition_point(|o| o.serialized_start <= idx);
        let origin = self.spans.get(after.checked_sub(1)?)?;
        if !origin.contains(idx) {
            return None;
        }
        let char_index = origin.assigned_index(idx)?;
        Some(ResolvedOrigin {
            origin: origin.clone(),
            char_index,
        })
    }
}

/// Serialized markup plus its origin records, as exchanged with callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupSnapshot {
    pub html: String,
    pub origins: Vec<OriginRecord>,
}

impl MarkupSnapshot {
    /// Snapshot `container`'s current markup with the given origins.
    pub fn capture(fragment: &Fragment, container: NodeId, mapped: &[MappedOrigin]) -> Self {
        Self {
            html: inner_html(fragment, container),
            origins: mapped.iter().map(|m| m.origin.clone()).collect(),
        }
    }

    pub fn mapping(&self) -> MarkupMapping {
        MarkupMapping::new(self.origins.iter().cloned())
    }

    pub fn origin_at_char_index(&self, idx: usize) -> Option<ResolvedOrigin> {
        if idx >= char_len(&self.html) {
            return None;
        }
        self.mapping().origin_at_char_index(idx)
    }
}
