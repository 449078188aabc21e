//! Origins for direct assignments that bypass markup parsing: text content,
//! a single attribute, a single style property.
//!
//! The assigned string is not markup here, so the only normalization is the
//! serializer's escaping. Each helper computes, per serialized character,
//! the assigned index it came from.

use std::sync::Arc;

use whence_types::{OriginAction, OriginRecord, RecordId, TrackedValue, char_len};

use crate::dom::{Fragment, NodeId};
use crate::mapper::{MappedOrigin, OriginTarget, assigned_text};
use crate::serialize::{escape_attribute, escape_text};

/// Text content assigned to `element`, whose serialized content starts at
/// `serialized_start`.
pub fn map_text_assignment(
    fragment: &Fragment,
    element: NodeId,
    assigned: &TrackedValue,
    serialized_start: usize,
) -> Vec<MappedOrigin> {
    let text = assigned_text(assigned);
    let value: Arc<str> = Arc::from(text.as_str());
    let mut out = vec![MappedOrigin {
        target: OriginTarget::Node(element),
        origin: OriginRecord::new(
            OriginAction::ReplaceContents,
            assigned.tracking,
            serialized_start,
            Arc::clone(&value),
        )
        .with_extra_chars(serialized_start as i64),
    }];

    let Some(&child) = fragment.children(element).first() else {
        return out;
    };
    let parent_tag = fragment.tag(element).unwrap_or("");
    let targets = escaped_targets(&text, |c| escape_text(c, parent_tag));
    out.push(MappedOrigin {
        target: OriginTarget::Node(child),
        origin: origin_from_targets(
            OriginAction::TextValue,
            assigned.tracking,
            serialized_start,
            &targets,
            value,
        ),
    });
    out
}

/// Attribute `name` set to `value` on `node`; `serialized_start` is the
/// position of the space before the attribute name.
pub fn map_attribute_assignment(
    node: NodeId,
    name: &TrackedValue,
    value: &TrackedValue,
    serialized_start: usize,
) -> Vec<MappedOrigin> {
    let name_text = assigned_text(name).to_ascii_lowercase();
    let value_text = assigned_text(value);
    let name_len = char_len(&name_text);
    let target = OriginTarget::Attribute {
        node,
        name: name_text.clone(),
    };

    // ` name`: the leading space maps to the name's first character.
    let mut name_targets = vec![0];
    name_targets.extend(0..name_len);

    // `="value"`
    let mut value_targets = vec![0, 0];
    value_targets.extend(escaped_targets(&value_text, escape_attribute));
    // Closing quote maps like the last value character.
    value_targets.push(char_len(&value_text).saturating_sub(1));

    vec![
        MappedOrigin {
            target: target.clone(),
            origin: origin_from_targets(
                OriginAction::AttributeName,
                name.tracking,
                serialized_start,
                &name_targets,
                Arc::from(name_text.as_str()),
            ),
        },
        MappedOrigin {
            target,
            origin: origin_from_targets(
                OriginAction::AttributeValue,
                value.tracking,
                serialized_start + 1 + name_len,
                &value_targets,
                Arc::from(value_text.as_str()),
            ),
        },
    ]
}

/// One style declaration on `node`. `declaration` is the `name: value`
/// string produced by a style-assignment record; it serializes inside the
/// style attribute as `name: value;` starting at `serialized_start`.
pub fn map_style_assignment(
    node: NodeId,
    declaration: &TrackedValue,
    serialized_start: usize,
) -> MappedOrigin {
    let text = assigned_text(declaration);
    let mut targets = escaped_targets(&text, escape_attribute);
    targets.push(char_len(&text));
    MappedOrigin {
        target: OriginTarget::Attribute {
            node,
            name: "style".to_string(),
        },
        origin: origin_from_targets(
            OriginAction::StyleAssignment,
            declaration.tracking,
            serialized_start,
            &targets,
            Arc::from(text.as_str()),
        ),
    }
}

/// For each character of `raw`, repeat its index once per serialized
/// character it escapes to.
fn escaped_targets(raw: &str, escape: impl Fn(&str) -> String) -> Vec<usize> {
    let mut targets = Vec::with_capacity(raw.len());
    let mut buf = [0u8; 4];
    for (index, c) in raw.chars().enumerate() {
        let escaped = escape(c.encode_utf8(&mut buf));
        targets.extend(std::iter::repeat_n(index, char_len(&escaped)));
    }
    targets
}

/// An origin whose serialized character `serialized_start + i` maps to
/// assigned index `targets[i]`.
fn origin_from_targets(
    action: OriginAction,
    tracking: Option<RecordId>,
    serialized_start: usize,
    targets: &[usize],
    value: Arc<str>,
) -> OriginRecord {
    let offsets = targets
        .iter()
        .enumerate()
        .map(|(relative, target)| *target as i64 - relative as i64)
        .collect();
    OriginRecord::new(action, tracking, serialized_start, value)
        .with_len(targets.len())
        .with_extra_chars(serialized_start as i64)
        .with_offsets(offsets)
}
