//! In-memory record store.
//!
//! # Concurrency Model
//!
//! - DashMap for lock-free concurrent reads of records and the location index
//! - A parking_lot mutex serializes writers, so batches never interleave
//! - An atomic high-water mark separates "allocated" from "never allocated"

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;
use whence_types::{Record, RecordDraft, RecordId};

use crate::error::StoreResult;
use crate::store::{Fetch, RecordStore, resolve_batch};

/// DashMap-backed store. Records are visible as soon as their batch insert
/// completes; nothing survives the process.
pub struct MemoryStore {
    records: DashMap<RecordId, Arc<Record>>,
    by_location: DashMap<String, Vec<RecordId>>,
    /// Next ID to hand out. Held for the whole append.
    next_id: Mutex<RecordId>,
    /// Highest allocated ID (0 when empty).
    allocated: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            by_location: DashMap::new(),
            next_id: Mutex::new(RecordId::FIRST),
            allocated: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryStore {
    fn append(&self, batch: Vec<RecordDraft>) -> StoreResult<Vec<RecordId>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let mut next_id = self.next_id.lock();
        let records = resolve_batch(batch, *next_id)?;
        let ids: Vec<RecordId> = records.iter().map(|r| r.id).collect();
        if let Some(last) = ids.last() {
            self.allocated.store(last.get(), Ordering::Release);
            *next_id = last.next();
        }

        for record in records {
            if let Some(loc) = record.loc() {
                self.by_location.entry(loc.key()).or_default().push(record.id);
            }
            self.records.insert(record.id, Arc::new(record));
        }

        debug!(first = %ids[0], count = ids.len(), "appended batch");
        Ok(ids)
    }

    fn get(&self, id: RecordId) -> StoreResult<Fetch> {
        if let Some(record) = self.records.get(&id) {
            return Ok(Fetch::Found(Arc::clone(record.value())));
        }
        if id.get() != 0 && id.get() <= self.allocated.load(Ordering::Acquire) {
            Ok(Fetch::NotYetAvailable)
        } else {
            Ok(Fetch::NotFound)
        }
    }

    fn find_by_location(&self, loc_key: &str) -> StoreResult<Vec<RecordId>> {
        Ok(self
            .by_location
            .get(loc_key)
            .map(|ids| ids.clone())
            .unwrap_or_default())
    }

    fn flush(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use whence_types::{DraftRef, Position, SourceLoc, TrackedValue};

    fn hello_world() -> Vec<RecordDraft> {
        vec![
            RecordDraft::string_literal("Hello, "),
            RecordDraft::string_literal("World"),
            RecordDraft::concat(
                TrackedValue::tracked("Hello, ", DraftRef::InBatch(0)),
                TrackedValue::tracked("World", DraftRef::InBatch(1)),
            ),
        ]
    }

    #[test]
    fn test_append_and_get() {
        let store = MemoryStore::new();
        let ids = store.append(hello_world()).unwrap();
        assert_eq!(ids, vec![RecordId::new(1), RecordId::new(2), RecordId::new(3)]);

        let record = store.get(ids[2]).unwrap().found().unwrap();
        assert_eq!(record.arg("left").unwrap().tracking, Some(ids[0]));
        assert_eq!(store.get(RecordId::new(4)).unwrap(), Fetch::NotFound);
        assert_eq!(store.get(RecordId::new(0)).unwrap(), Fetch::NotFound);
    }

    #[test]
    fn test_ids_continue_across_batches() {
        let store = MemoryStore::new();
        store.append(hello_world()).unwrap();
        let ids = store
            .append(vec![RecordDraft::concat(
                TrackedValue::tracked("Hello, World", RecordId::new(3)),
                TrackedValue::untracked("!"),
            )])
            .unwrap();
        assert_eq!(ids, vec![RecordId::new(4)]);
    }

    #[test]
    fn test_invalid_reference_rejects_whole_batch() {
        let store = MemoryStore::new();
        let batch = vec![
            RecordDraft::string_literal("a"),
            RecordDraft::concat(
                TrackedValue::tracked("a", DraftRef::InBatch(0)),
                TrackedValue::tracked("b", RecordId::new(9)),
            ),
        ];
        let err = store.append(batch).unwrap_err();
        assert!(matches!(err, StoreError::InvalidReference(_)));
        assert!(store.is_empty());
        assert_eq!(store.get(RecordId::FIRST).unwrap(), Fetch::NotFound);

        // No IDs were consumed by the failed batch.
        let ids = store.append(vec![RecordDraft::string_literal("a")]).unwrap();
        assert_eq!(ids, vec![RecordId::FIRST]);
    }

    #[test]
    fn test_find_by_location() {
        let store = MemoryStore::new();
        let loc = SourceLoc::new(
            "app.js",
            Position { line: 3, column: 8 },
            Position { line: 3, column: 15 },
        );
        store
            .append(vec![
                RecordDraft::string_literal("x").loc(loc.clone()),
                RecordDraft::string_literal("y"),
                RecordDraft::string_literal("x").loc(loc),
            ])
            .unwrap();
        assert_eq!(
            store.find_by_location("app.js:3:8").unwrap(),
            vec![RecordId::new(1), RecordId::new(3)]
        );
        assert!(store.find_by_location("app.js:4:0").unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_batches_do_not_interleave() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    (0..25)
                        .map(|_| store.append(hello_world()).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            for ids in handle.join().unwrap() {
                assert_eq!(ids[1], ids[0].next());
                assert_eq!(ids[2], ids[1].next());
            }
        }
        assert_eq!(store.len(), 8 * 25 * 3);
    }
}
