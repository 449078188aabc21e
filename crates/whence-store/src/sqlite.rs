//! SQLite persistence for operation records.
//!
//! Append-only records table with a write-behind buffer. Appends allocate IDs
//! immediately and queue the records; a flush writes every queued record in
//! one transaction. Until then readers see [`Fetch::NotYetAvailable`].

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use whence_types::{Record, RecordDraft, RecordId};

use crate::config::BatchConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::{Fetch, RecordStore, resolve_batch};

const SCHEMA: &str = r#"
-- Operation records (append-only, immutable)
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY,
    kind TEXT NOT NULL,
    loc_key TEXT,
    body TEXT NOT NULL,
    created_at INTEGER DEFAULT (unixepoch())
);
CREATE INDEX IF NOT EXISTS idx_records_loc ON records(loc_key, id);
"#;

/// A record waiting for the next flush.
#[derive(Debug)]
struct PendingRecord {
    record: Arc<Record>,
    queued_at: Instant,
}

/// Write-behind buffer plus the ID allocator.
#[derive(Debug)]
struct Pending {
    next_id: RecordId,
    records: BTreeMap<RecordId, PendingRecord>,
}

impl Pending {
    /// Check if the buffer should be flushed based on config.
    fn should_flush(&self, config: &BatchConfig) -> bool {
        if self.records.len() >= config.max_pending_records {
            return true;
        }
        self.oldest_age()
            .is_some_and(|age| age >= config.max_pending_age)
    }

    fn oldest_age(&self) -> Option<Duration> {
        self.records.values().next().map(|p| p.queued_at.elapsed())
    }
}

/// SQLite-backed record store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    pending: Mutex<Pending>,
    config: BatchConfig,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P, config: BatchConfig) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn, config)
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory(config: BatchConfig) -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, config)
    }

    fn from_connection(conn: Connection, config: BatchConfig) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        let max_id: i64 =
            conn.query_row("SELECT COALESCE(MAX(id), 0) FROM records", [], |row| row.get(0))?;
        let next_id = RecordId::new(max_id as u64).next();
        info!(%next_id, "record store ready");

        Ok(Self {
            conn: Mutex::new(conn),
            pending: Mutex::new(Pending {
                next_id,
                records: BTreeMap::new(),
            }),
            config,
        })
    }

    /// Number of records allocated but not yet durable.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().records.len()
    }

    /// Write every pending record in one transaction.
    ///
    /// On failure the transaction rolls back and the records stay pending.
    /// Returns the number of records made durable.
    pub fn flush_pending(&self) -> StoreResult<usize> {
        let mut conn = self.conn.lock();
        let batch: Vec<Arc<Record>> = self
            .pending
            .lock()
            .records
            .values()
            .map(|p| Arc::clone(&p.record))
            .collect();
        let Some(last) = batch.last().map(|r| r.id) else {
            return Ok(0);
        };

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO records (id, kind, loc_key, body) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for record in &batch {
                let body = serde_json::to_string(record.as_ref())?;
                stmt.execute(params![
                    record.id.get() as i64,
                    record.kind.as_str(),
                    record.loc().map(|loc| loc.key()),
                    body,
                ])?;
            }
        }
        tx.commit()?;

        {
            let mut pending = self.pending.lock();
            pending.records = pending.records.split_off(&last.next());
        }
        debug!(count = batch.len(), %last, "flushed pending records");
        Ok(batch.len())
    }

    /// Flush only if a size or age limit has been reached.
    pub fn flush_if_due(&self) -> StoreResult<usize> {
        let due = self.pending.lock().should_flush(&self.config);
        if due { self.flush_pending() } else { Ok(0) }
    }

    /// Spawn a task that enforces `max_pending_age` while the store is alive.
    ///
    /// The task holds only a weak reference and exits once the store drops.
    pub fn spawn_flusher(self: &Arc<Self>) -> JoinHandle<()> {
        let store = Arc::downgrade(self);
        let period = self.config.max_pending_age.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else { break };
                if let Err(e) = store.flush_if_due() {
                    warn!(error = %e, "background flush failed, records stay pending");
                }
            }
            debug!("record store flusher stopped");
        })
    }

    fn load(&self, id: RecordId) -> StoreResult<Option<Record>> {
        let conn = self.conn.lock();
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM records WHERE id = ?1",
                params![id.get() as i64],
                |row| row.get(0),
            )
            .optional()?;

        let Some(body) = body else {
            return Ok(None);
        };
        let record: Record = serde_json::from_str(&body)?;
        if record.id != id {
            return Err(StoreError::Corrupt {
                id,
                reason: format!("row holds {}", record.id),
            });
        }
        Ok(Some(record))
    }
}

impl RecordStore for SqliteStore {
    fn append(&self, batch: Vec<RecordDraft>) -> StoreResult<Vec<RecordId>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let (ids, due) = {
            let mut pending = self.pending.lock();
            let records = resolve_batch(batch, pending.next_id)?;
            let queued_at = Instant::now();
            let ids: Vec<RecordId> = records.iter().map(|r| r.id).collect();
            for record in records {
                pending.records.insert(
                    record.id,
                    PendingRecord {
                        record: Arc::new(record),
                        queued_at,
                    },
                );
            }
            if let Some(last) = ids.last() {
                pending.next_id = last.next();
            }
            (ids, pending.should_flush(&self.config))
        };

        // The batch is accepted either way; a failed flush is retried later.
        if due {
            if let Err(e) = self.flush_pending() {
                warn!(error = %e, "flush after append failed, records stay pending");
            }
        }
        Ok(ids)
    }

    fn get(&self, id: RecordId) -> StoreResult<Fetch> {
        if let Err(e) = self.flush_if_due() {
            warn!(error = %e, "flush on read failed, records stay pending");
        }
        {
            let pending = self.pending.lock();
            if pending.records.contains_key(&id) {
                return Ok(Fetch::NotYetAvailable);
            }
            if id.get() == 0 || id >= pending.next_id {
                return Ok(Fetch::NotFound);
            }
        }

        Ok(match self.load(id)? {
            Some(record) => Fetch::Found(Arc::new(record)),
            None => Fetch::NotFound,
        })
    }

    fn find_by_location(&self, loc_key: &str) -> StoreResult<Vec<RecordId>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached("SELECT id FROM records WHERE loc_key = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![loc_key], |row| row.get::<_, i64>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(RecordId::new(row? as u64));
        }
        Ok(ids)
    }

    fn flush(&self) -> StoreResult<()> {
        self.flush_pending().map(|_| ())
    }
}

impl Drop for SqliteStore {
    fn drop(&mut self) {
        let pending = self.pending_count();
        if pending > 0 {
            if let Err(e) = self.flush_pending() {
                warn!(error = %e, pending, "final flush failed, pending records lost");
            }
        }
    }
}
