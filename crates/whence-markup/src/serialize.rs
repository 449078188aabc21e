//! Markup serialization, following the HTML fragment serialization rules.
//!
//! The mapper and the serializer must agree character for character, so
//! both go through [`escape_text`] and [`escape_attribute`].

use crate::dom::{Fragment, NodeId, NodeKind};

/// Elements that never have content or a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose text children serialize without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "iframe", "noembed", "noframes", "plaintext", "script", "style", "xmp",
];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

pub fn is_raw_text(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

/// Serialized form of a text node whose parent is `parent_tag`.
pub fn escape_text(text: &str, parent_tag: &str) -> String {
    if is_raw_text(parent_tag) {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

/// Serialized form of an attribute value (without the quotes).
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

/// Serialized children of `node` (`innerHTML`).
pub fn inner_html(fragment: &Fragment, node: NodeId) -> String {
    let mut out = String::new();
    let tag = fragment.tag(node).unwrap_or("");
    for child in fragment.children(node) {
        serialize_node(fragment, *child, tag, &mut out);
    }
    out
}

/// Serialized `node` including itself (`outerHTML`).
pub fn outer_html(fragment: &Fragment, node: NodeId) -> String {
    let mut out = String::new();
    let parent_tag = fragment
        .parent(node)
        .and_then(|p| fragment.tag(p))
        .unwrap_or("");
    serialize_node(fragment, node, parent_tag, &mut out);
    out
}

fn serialize_node(fragment: &Fragment, node: NodeId, parent_tag: &str, out: &mut String) {
    let Some(n) = fragment.get(node) else { return };
    match &n.kind {
        NodeKind::Text(text) => out.push_str(&escape_text(text, parent_tag)),
        NodeKind::Comment(data) => {
            out.push_str("<!--");
            out.push_str(data);
            out.push_str("-->");
        }
        NodeKind::Element { tag, attrs } => {
            out.push('<');
            out.push_str(tag);
            for attr in attrs {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                out.push_str(&escape_attribute(&attr.value));
                out.push('"');
            }
            out.push('>');
            if is_void(tag) {
                return;
            }
            for child in &n.children {
                serialize_node(fragment, *child, tag, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}
