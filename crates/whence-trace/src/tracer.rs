//! Query facade.
//!
//! `Tracer` bundles a store and a traversal engine behind the operations
//! collaborators call: ingest batches, trace a value, resolve a character of
//! serialized markup, and check whether a record has arrived.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use whence_markup::{MarkupSnapshot, ResolvedOrigin};
use whence_store::{SharedStore, StoreResult};
use whence_types::{Record, RecordDraft, RecordId};

use crate::config::{TraverseConfig, TraverseOptions};
use crate::engine::TraversalEngine;
use crate::error::TraversalResult;
use crate::rules::RuleTable;
use crate::trace::{Step, Trace};

/// A markup character resolved and, when tracked, traced.
#[derive(Debug, Clone, Serialize)]
pub struct MarkupInspection {
    pub origin: ResolvedOrigin,
    /// `None` when the assigned string had no producer.
    pub trace: Option<Trace>,
}

pub struct Tracer {
    store: SharedStore,
    engine: TraversalEngine,
}

impl Tracer {
    pub fn new(store: SharedStore) -> Self {
        Self::with_config(store, RuleTable::default(), TraverseConfig::default())
    }

    pub fn with_config(store: SharedStore, rules: RuleTable, config: TraverseConfig) -> Self {
        let engine = TraversalEngine::with_config(Arc::clone(&store), rules, config);
        Self { store, engine }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn engine(&self) -> &TraversalEngine {
        &self.engine
    }

    /// Append a batch of records, returning their IDs in order.
    pub fn ingest(&self, batch: Vec<RecordDraft>) -> StoreResult<Vec<RecordId>> {
        let count = batch.len();
        let ids = self.store.append(batch)?;
        if let (Some(first), Some(last)) = (ids.first(), ids.last()) {
            info!(count, %first, %last, "ingested batch");
        }
        Ok(ids)
    }

    pub async fn traverse(
        &self,
        id: RecordId,
        char_index: usize,
        options: TraverseOptions,
    ) -> TraversalResult<Trace> {
        self.engine.traverse(Step::new(id, char_index), options).await
    }

    /// Translate a character of serialized markup into the assigned string.
    pub fn resolve_markup_char(&self, snapshot: &MarkupSnapshot, char_index: usize) -> Option<ResolvedOrigin> {
        snapshot.origin_at_char_index(char_index)
    }

    /// Resolve a markup character, then trace it when its origin is tracked.
    pub async fn inspect_markup_char(
        &self,
        snapshot: &MarkupSnapshot,
        char_index: usize,
        options: TraverseOptions,
    ) -> TraversalResult<Option<MarkupInspection>> {
        let Some(origin) = self.resolve_markup_char(snapshot, char_index) else {
            return Ok(None);
        };
        let trace = match origin.tracking() {
            Some(id) => Some(self.traverse(id, origin.char_index, options).await?),
            None => None,
        };
        Ok(Some(MarkupInspection { origin, trace }))
    }

    pub fn has_record(&self, id: RecordId) -> StoreResult<bool> {
        self.store.has_record(id)
    }

    /// Poll until `id` is visible, using the traversal timeout.
    pub async fn wait_for_record(&self, id: RecordId) -> TraversalResult<Arc<Record>> {
        self.engine.wait_for_record(id).await
    }
}
