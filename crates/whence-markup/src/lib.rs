//! Markup origin mapping for whence.
//!
//! When a tracked string is assigned as markup, the DOM re-serializes it in a
//! normalized form. This crate ties every serialized character back to the
//! assigned string:
//!
//! - [`OriginMapper`] walks the nodes an assignment produced and emits
//!   [`OriginRecord`]s with per-character correction tables
//! - [`assign`] covers direct text, attribute and style assignments
//! - [`MarkupMapping`] resolves a serialized character index to
//!   `(tracking, char_index)`, ready for traversal
//!
//! Collaborators are injected: a [`ClosingTagProbe`] answers which tags
//! serialize a closing tag, and a [`DiagnosticSink`] receives alignment
//! failures.
//!
//! [`OriginRecord`]: whence_types::OriginRecord

pub mod assign;
pub mod diagnostics;
pub mod dom;
pub mod mapper;
pub mod probe;
pub mod resolver;
pub mod serialize;

pub use assign::{map_attribute_assignment, map_style_assignment, map_text_assignment};
pub use diagnostics::{CollectingSink, DiagnosticKind, DiagnosticSink, MappingDiagnostic, TracingSink};
pub use dom::{Attribute, Fragment, Node, NodeId, NodeKind};
pub use mapper::{MapOptions, MappedOrigin, OriginMapper, OriginTarget};
pub use probe::{ClosingTagProbe, MemoizedProbe, VoidElements};
pub use resolver::{MarkupMapping, MarkupSnapshot, ResolvedOrigin};
pub use serialize::{inner_html, outer_html};
