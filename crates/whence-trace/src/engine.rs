//! The traversal engine.
//!
//! Walks backward from `(id, char_index)` one rule application at a time
//! until a rule reports a terminal. Each step fetches one record; records
//! that are allocated but not yet durable are polled for.
//!
//! A visited set rejects cycles in corrupt logs; `max_steps`, when set,
//! bounds the walk. Failures keep the steps walked so far.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::time::{Instant, sleep};
use tracing::{debug, warn};
use whence_store::{Fetch, SharedStore};
use whence_types::{Record, RecordId};

use crate::config::{TraverseConfig, TraverseOptions};
use crate::error::{TraversalError, TraversalResult};
use crate::rules::{RuleOutcome, RuleTable, TerminalReason};
use crate::trace::{Step, Trace, TraceEnd};

pub struct TraversalEngine {
    store: SharedStore,
    rules: RuleTable,
    config: TraverseConfig,
}

impl TraversalEngine {
    /// Engine with the default rules and limits.
    pub fn new(store: SharedStore) -> Self {
        Self::with_config(store, RuleTable::default(), TraverseConfig::default())
    }

    pub fn with_config(store: SharedStore, rules: RuleTable, config: TraverseConfig) -> Self {
        Self {
            store,
            rules,
            config,
        }
    }

    pub fn config(&self) -> &TraverseConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Walk back from `start` to where its character originated.
    pub async fn traverse(&self, start: Step, options: TraverseOptions) -> TraversalResult<Trace> {
        let mut steps = Vec::new();
        let mut visited = HashSet::new();
        let mut current = start;

        loop {
            if !visited.insert(current) {
                warn!(step = %current, "traversal revisited a step, log is not a DAG");
                steps.push(current);
                return Err(TraversalError::TraversalCycleDetected {
                    step: current,
                    steps,
                });
            }
            if let Some(max_steps) = self.config.max_steps.filter(|max| steps.len() >= *max) {
                warn!(max_steps, start = %start, "traversal hit max_steps, aborting");
                return Err(TraversalError::StepLimitExceeded { max_steps, steps });
            }
            steps.push(current);
            debug!(id = %current.id, char_index = current.char_index, "traversal step");

            let record = match self.poll(current.id).await? {
                Polled::Found(record) => record,
                Polled::NotFound => {
                    return Err(TraversalError::LogNotFound {
                        id: current.id,
                        steps,
                    });
                }
                Polled::TimedOut if options.optimistic => {
                    debug!(missing = %current.id, "record never arrived, returning partial trace");
                    return Ok(Trace {
                        steps,
                        end: TraceEnd::Incomplete {
                            missing: current.id,
                        },
                    });
                }
                Polled::TimedOut => {
                    return Err(TraversalError::LogNotFoundTimeout {
                        id: current.id,
                        waited: self.config.timeout,
                        steps,
                    });
                }
            };

            let Some(outcome) = self.rules.apply(&record, current.char_index) else {
                return Ok(Trace {
                    steps,
                    end: TraceEnd::Unsupported {
                        kind: record.kind.clone(),
                        detail: "no rule registered".to_string(),
                    },
                });
            };

            match outcome {
                RuleOutcome::Next(next) => current = next,
                RuleOutcome::Terminal(reason) => {
                    let end = match reason {
                        TerminalReason::Literal => TraceEnd::Origin,
                        TerminalReason::Synthesized => TraceEnd::Synthesized,
                        TerminalReason::Untracked { operand } => TraceEnd::Untracked { operand },
                        TerminalReason::Unsupported { detail } => TraceEnd::Unsupported {
                            kind: record.kind.clone(),
                            detail,
                        },
                    };
                    return Ok(Trace { steps, end });
                }
            }
        }
    }

    /// Wait for `id` to become visible, failing after the configured timeout.
    pub async fn wait_for_record(&self, id: RecordId) -> TraversalResult<Arc<Record>> {
        match self.poll(id).await? {
            Polled::Found(record) => Ok(record),
            Polled::NotFound => Err(TraversalError::LogNotFound {
                id,
                steps: Vec::new(),
            }),
            Polled::TimedOut => Err(TraversalError::LogNotFoundTimeout {
                id,
                waited: self.config.timeout,
                steps: Vec::new(),
            }),
        }
    }

    /// Fetch `id`, polling while it is not yet available.
    async fn poll(&self, id: RecordId) -> TraversalResult<Polled> {
        let deadline = Instant::now() + self.config.timeout;
        loop {
            match self.store.get(id)? {
                Fetch::Found(record) => return Ok(Polled::Found(record)),
                Fetch::NotFound => return Ok(Polled::NotFound),
                Fetch::NotYetAvailable => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(Polled::TimedOut);
                    }
                    sleep(self.config.poll_interval.min(deadline - now)).await;
                }
            }
        }
    }
}

enum Polled {
    Found(Arc<Record>),
    NotFound,
    TimedOut,
}
