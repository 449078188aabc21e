//! Markup origin records.
//!
//! When a string is assigned as markup, the browser parses it and later
//! serializes it back in a normalized form. An [`OriginRecord`] ties one span
//! of that serialized form to the assigned string it came from, plus the
//! per-character corrections needed to undo the normalization.
//!
//! Position arithmetic lives here so every consumer resolves the same way:
//!
//! ```text
//! assigned = idx - extra_chars_added + offset_at_char_index[idx - serialized_start]
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::ids::RecordId;

/// Which piece of a node an origin record covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum OriginAction {
    /// Whole-content assignment (`textContent`, attribute set directly).
    ReplaceContents,
    TextValue,
    OpeningTagStart,
    OpeningTagEnd,
    ClosingTag,
    CommentStart,
    CommentEnd,
    /// Leading space plus attribute name.
    AttributeName,
    /// `=`, quotes and the attribute value.
    AttributeValue,
    StyleAssignment,
}

impl OriginAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReplaceContents => "replace-contents",
            Self::TextValue => "text-value",
            Self::OpeningTagStart => "opening-tag-start",
            Self::OpeningTagEnd => "opening-tag-end",
            Self::ClosingTag => "closing-tag",
            Self::CommentStart => "comment-start",
            Self::CommentEnd => "comment-end",
            Self::AttributeName => "attribute-name",
            Self::AttributeValue => "attribute-value",
            Self::StyleAssignment => "style-assignment",
        }
    }
}

impl std::fmt::Display for OriginAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One serialized span traced back to an assigned string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginRecord {
    pub action: OriginAction,
    /// Record that produced the assigned string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking: Option<RecordId>,
    /// Start of the span in the serialized output, in characters.
    pub serialized_start: usize,
    /// Span length in characters. Zero-length spans never match a lookup.
    #[serde(default)]
    pub serialized_len: usize,
    /// Net characters the serializer added before this span.
    #[serde(default)]
    pub extra_chars_added: i64,
    /// Per-character correction, indexed relative to `serialized_start`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_at_char_index: Option<Vec<i64>>,
    /// The assigned string (shared across all records of one assignment).
    pub value: Arc<str>,
    /// Diagnostic copy of the serialized text this span covers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture: Option<String>,
}

impl OriginRecord {
    pub fn new(
        action: OriginAction,
        tracking: Option<RecordId>,
        serialized_start: usize,
        value: Arc<str>,
    ) -> Self {
        Self {
            action,
            tracking,
            serialized_start,
            serialized_len: 0,
            extra_chars_added: 0,
            offset_at_char_index: None,
            value,
            capture: None,
        }
    }

    pub fn with_len(mut self, len: usize) -> Self {
        self.serialized_len = len;
        self
    }

    pub fn with_extra_chars(mut self, extra: i64) -> Self {
        self.extra_chars_added = extra;
        self
    }

    pub fn with_offsets(mut self, offsets: Vec<i64>) -> Self {
        self.offset_at_char_index = Some(offsets);
        self
    }

    pub fn with_capture(mut self, capture: impl Into<String>) -> Self {
        self.capture = Some(capture.into());
        self
    }

    pub fn serialized_end(&self) -> usize {
        self.serialized_start + self.serialized_len
    }

    /// Whether `idx` (a serialized position) falls inside this span.
    pub fn contains(&self, idx: usize) -> bool {
        idx >= self.serialized_start && idx < self.serialized_end()
    }

    /// Correction at a span-relative index. Missing entries mean no correction.
    pub fn offset_at(&self, relative: usize) -> i64 {
        self.offset_at_char_index
            .as_ref()
            .and_then(|offsets| offsets.get(relative).copied())
            .unwrap_or(0)
    }

    /// Map a serialized position inside this span to a position in `value`.
    ///
    /// Returns `None` when the arithmetic lands before the start of the
    /// assigned string, which means the tables are inconsistent.
    pub fn assigned_index(&self, idx: usize) -> Option<usize> {
        let relative = idx.checked_sub(self.serialized_start)?;
        let assigned = idx as i64 - self.extra_chars_added + self.offset_at(relative);
        usize::try_from(assigned).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assigned_index_undoes_entity_expansion() {
        // Assigned "a & b", serialized "a &amp; b".
        let value: Arc<str> = Arc::from("a & b");
        let origin = OriginRecord::new(OriginAction::TextValue, Some(RecordId::new(1)), 0, value)
            .with_len(9)
            .with_offsets(vec![0, 0, 0, -1, -2, -3, -4, -4, -4]);

        assert_eq!(origin.assigned_index(0), Some(0));
        assert_eq!(origin.assigned_index(2), Some(2));
        assert_eq!(origin.assigned_index(6), Some(2));
        assert_eq!(origin.assigned_index(7), Some(3));
        assert_eq!(origin.assigned_index(8), Some(4));
    }

    #[test]
    fn test_assigned_index_with_extra_chars_and_start() {
        let origin = OriginRecord::new(OriginAction::TextValue, None, 10, Arc::from("<b>hi</b>"))
            .with_len(2)
            .with_extra_chars(7);
        // Serialized 10 is preceded by the 3-char open tag in the assigned string.
        assert_eq!(origin.assigned_index(10), Some(3));
        assert_eq!(origin.assigned_index(11), Some(4));
        assert_eq!(origin.assigned_index(9), None);
    }

    #[test]
    fn test_contains_excludes_empty_span() {
        let origin = OriginRecord::new(OriginAction::TextValue, None, 4, Arc::from(""));
        assert!(!origin.contains(4));
        let origin = origin.with_len(1);
        assert!(origin.contains(4));
        assert!(!origin.contains(5));
    }

    #[test]
    fn test_action_serde_is_kebab() {
        let json = serde_json::to_string(&OriginAction::OpeningTagStart).unwrap();
        assert_eq!(json, "\"opening-tag-start\"");
        assert_eq!("attribute-value".parse::<OriginAction>().unwrap(), OriginAction::AttributeValue);
    }
}
