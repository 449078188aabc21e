//! Traversal configuration.

use std::time::Duration;

/// Engine-wide polling and safety limits.
#[derive(Debug, Clone)]
pub struct TraverseConfig {
    /// Delay between lookups of a not-yet-available record.
    pub poll_interval: Duration,
    /// How long to wait for a not-yet-available record.
    pub timeout: Duration,
    /// Optional cap on steps per traversal. Unbounded by default: the
    /// visited set already ends every walk over a finite log.
    pub max_steps: Option<usize>,
}

impl Default for TraverseConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            timeout: Duration::from_millis(5000),
            max_steps: None,
        }
    }
}

impl TraverseConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }
}

/// Per-query options.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraverseOptions {
    /// Return the partial trace instead of failing when a record never
    /// becomes available.
    pub optimistic: bool,
}

impl TraverseOptions {
    pub fn optimistic() -> Self {
        Self { optimistic: true }
    }
}
