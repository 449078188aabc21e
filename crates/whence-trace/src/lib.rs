//! Backward traversal for whence.
//!
//! Given a logged value and a character index, walk back through the
//! operation log to the record that introduced that character.
//!
//! ```text
//! (id, char_index) ──fetch──▶ Record ──RuleTable[kind]──▶ Next(step) ─┐
//!        ▲                                                            │
//!        └────────────────────────────────────────────────────────────┘
//!                                            Terminal(reason) ──▶ Trace
//! ```
//!
//! [`Tracer`] is the query surface; [`TraversalEngine`] and [`RuleTable`]
//! are the moving parts.

pub mod config;
pub mod engine;
pub mod error;
pub mod rules;
pub mod trace;
pub mod tracer;

pub use config::{TraverseConfig, TraverseOptions};
pub use engine::TraversalEngine;
pub use error::{TraversalError, TraversalResult};
pub use rules::{Rule, RuleOutcome, RuleTable, TerminalReason};
pub use trace::{Step, Trace, TraceEnd};
pub use tracer::{MarkupInspection, Tracer};
