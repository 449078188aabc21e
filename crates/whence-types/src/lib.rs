//! Shared operation-log and markup-origin types for whence.
//!
//! This crate is the relational foundation: typed record IDs, the operation
//! record schema, and markup origin records. It has **no internal whence
//! dependencies**, a pure leaf crate that the store, the traversal engine and
//! the markup mapper build on.
//!
//! # Entity-Relationship Overview
//!
//! ```text
//! Record (RecordId) ← one tracked runtime operation
//!     └── kind (OperationKind) selects the traversal rule
//!     └── args / extra_args / runtime_args hold TrackedValues
//!           └── tracking → an earlier Record (or None for literals)
//!
//! OriginRecord ← one node / attribute span of assigned markup
//!     └── tracking → the Record that produced the assigned string
//!     └── offset_at_char_index maps serialized → assigned positions
//! ```
//!
//! # Key Types
//!
//! |-------------------|----------------------------------------------|
//! | Type              | Purpose                                      |
//! |-------------------|----------------------------------------------|
//! | [`RecordId`]      | Monotonic record identifier                  |
//! | [`Record`]        | Stored operation with resolved references    |
//! | [`RecordDraft`]   | Operation as emitted, before id assignment   |
//! | [`TrackedValue`]  | `(value, tracking)` operand pair             |
//! | [`OperationKind`] | Operation tag, drives rule dispatch          |
//! | [`OriginRecord`]  | Serialized-markup span → assigned string     |
//! |-------------------|----------------------------------------------|

pub mod error;
pub mod ids;
pub mod origin;
pub mod record;

pub use error::ModelError;
pub use ids::RecordId;
pub use origin::{OriginAction, OriginRecord};
pub use record::{
    Args, AssignmentTarget, DraftRef, OperationKind, Position, Record, RecordDraft, SourceLoc,
    StaticArgs, TrackedValue, char_len,
};
