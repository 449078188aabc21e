//! Store configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Write-behind buffering for the SQLite backend.
///
/// Pending batches are flushed when either limit is reached, on an explicit
/// flush, or by the background flusher.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Pending record count that forces a flush.
    pub max_pending_records: usize,
    /// Maximum time the oldest pending record may wait.
    pub max_pending_age: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_pending_records: 256,
            max_pending_age: Duration::from_millis(100),
        }
    }
}

impl BatchConfig {
    pub fn with_max_pending_records(mut self, n: usize) -> Self {
        self.max_pending_records = n;
        self
    }

    pub fn with_max_pending_age(mut self, age: Duration) -> Self {
        self.max_pending_age = age;
        self
    }
}

/// Which backend to open and how to tune it.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// SQLite database file. `None` selects the in-memory backend.
    pub path: Option<PathBuf>,
    pub batch: BatchConfig,
}

impl StoreConfig {
    pub fn memory() -> Self {
        Self::default()
    }

    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            batch: BatchConfig::default(),
        }
    }

    pub fn with_batch(mut self, batch: BatchConfig) -> Self {
        self.batch = batch;
        self
    }
}
