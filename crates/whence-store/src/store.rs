//! The record store contract.

use std::sync::Arc;

use tracing::info;
use whence_types::{Record, RecordDraft, RecordId};

use crate::config::StoreConfig;
use crate::error::StoreResult;
use crate::memory::MemoryStore;
use crate::sqlite::SqliteStore;

/// Outcome of a point lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetch {
    Found(Arc<Record>),
    /// The ID is allocated but its batch is not yet durable.
    NotYetAvailable,
    /// The ID was never allocated.
    NotFound,
}

impl Fetch {
    pub fn found(self) -> Option<Arc<Record>> {
        match self {
            Fetch::Found(record) => Some(record),
            _ => None,
        }
    }
}

/// Append-only, ordered record storage.
///
/// Single writer stream, many concurrent readers. Implementations use
/// internal locking only.
pub trait RecordStore: Send + Sync {
    /// Assign a contiguous run of fresh IDs to `batch`, in order.
    ///
    /// Fails the whole batch if any draft references a record that is not
    /// strictly older than itself.
    fn append(&self, batch: Vec<RecordDraft>) -> StoreResult<Vec<RecordId>>;

    fn get(&self, id: RecordId) -> StoreResult<Fetch>;

    /// True only for records a reader can fetch right now.
    fn has_record(&self, id: RecordId) -> StoreResult<bool> {
        Ok(matches!(self.get(id)?, Fetch::Found(_)))
    }

    /// IDs of visible records emitted at `loc_key` (`file:line:column`).
    fn find_by_location(&self, loc_key: &str) -> StoreResult<Vec<RecordId>>;

    /// Make every buffered batch durable.
    fn flush(&self) -> StoreResult<()>;
}

/// Shared store handle.
pub type SharedStore = Arc<dyn RecordStore>;

/// Open the backend selected by `config`.
pub fn open_store(config: &StoreConfig) -> StoreResult<SharedStore> {
    match &config.path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let store = Arc::new(SqliteStore::open(path, config.batch.clone())?);
            info!(path = %path.display(), "opened sqlite record store");
            // Reads also flush overdue records; the task covers idle stores.
            if tokio::runtime::Handle::try_current().is_ok() {
                store.spawn_flusher();
            }
            Ok(store)
        }
        None => Ok(Arc::new(MemoryStore::new())),
    }
}

/// Resolve a batch of drafts against IDs starting at `first`.
pub(crate) fn resolve_batch(batch: Vec<RecordDraft>, first: RecordId) -> StoreResult<Vec<Record>> {
    let mut ids = Vec::with_capacity(batch.len());
    let mut records = Vec::with_capacity(batch.len());
    for (index, draft) in batch.into_iter().enumerate() {
        let id = first.offset(index);
        records.push(draft.resolve(id, &ids)?);
        ids.push(id);
    }
    Ok(records)
}
