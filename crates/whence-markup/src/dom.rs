//! Arena document fragment.
//!
//! The mapper needs exactly what a parsed markup assignment leaves behind:
//! elements with ordered attributes, text, and comments. Nodes live in one
//! `Vec` and refer to each other by [`NodeId`].

use serde::{Deserialize, Serialize};

/// Index of a node inside its [`Fragment`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Tag names are stored lowercase.
    Element { tag: String, attrs: Vec<Attribute> },
    Text(String),
    Comment(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// A container element and everything parsed into it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    nodes: Vec<Node>,
}

impl Fragment {
    /// New fragment whose root is an empty `container_tag` element.
    pub fn new(container_tag: &str) -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Element {
                    tag: container_tag.to_ascii_lowercase(),
                    attrs: Vec::new(),
                },
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Lowercase tag name, if `id` is an element.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.get(id)?.kind {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn append_element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs
            .iter()
            .map(|(name, value)| Attribute {
                name: name.to_ascii_lowercase(),
                value: value.to_string(),
            })
            .collect();
        self.push(
            parent,
            NodeKind::Element {
                tag: tag.to_ascii_lowercase(),
                attrs,
            },
        )
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push(parent, NodeKind::Text(text.to_string()))
    }

    pub fn append_comment(&mut self, parent: NodeId, data: &str) -> NodeId {
        self.push(parent, NodeKind::Comment(data.to_string()))
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.push(id);
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_tree() {
        let mut fragment = Fragment::new("DIV");
        let root = fragment.root();
        let link = fragment.append_element(root, "A", &[("HREF", "/x")]);
        let text = fragment.append_text(link, "hi");

        assert_eq!(fragment.tag(root), Some("div"));
        assert_eq!(fragment.tag(link), Some("a"));
        assert_eq!(fragment.tag(text), None);
        assert_eq!(fragment.children(root), &[link]);
        assert_eq!(fragment.parent(text), Some(link));
        match &fragment.get(link).unwrap().kind {
            NodeKind::Element { attrs, .. } => assert_eq!(attrs[0].name, "href"),
            other => panic!("expected element, got {other:?}"),
        }
    }
}
