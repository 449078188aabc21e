//! Append-only record store for whence.
//!
//! Records are keyed by a monotonically increasing [`RecordId`] and never
//! change once appended. Reads are eventually consistent: an ID may be
//! allocated before its batch is durable, in which case readers see
//! [`Fetch::NotYetAvailable`] and are expected to poll.
//!
//! # Backends
//!
//! - [`MemoryStore`]: DashMap-backed, visible as soon as a batch is inserted
//! - [`SqliteStore`]: write-behind buffer over an append-only SQLite table
//!
//! Both implement [`RecordStore`]; callers hold a [`SharedStore`].
//!
//! [`RecordId`]: whence_types::RecordId

pub mod config;
pub mod error;
pub mod memory;
pub mod sqlite;
pub mod store;

pub use config::{BatchConfig, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::{Fetch, RecordStore, SharedStore, open_store};
