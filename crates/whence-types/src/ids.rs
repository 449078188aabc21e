//! Typed record identifiers.
//!
//! Record IDs are assigned by the store in strictly increasing order and are
//! never reused. The numeric order doubles as the DAG order: a record may only
//! reference IDs smaller than its own.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A record identifier (monotonic, starts at 1).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    /// The first ID a fresh store hands out.
    pub const FIRST: RecordId = RecordId(1);

    /// Wrap a raw value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric value.
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// The ID immediately after this one.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Offset by `n` positions (used when assigning a contiguous batch).
    pub fn offset(&self, n: usize) -> Self {
        Self(self.0 + n as u64)
    }
}

impl From<u64> for RecordId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<RecordId> for u64 {
    fn from(id: RecordId) -> u64 {
        id.0
    }
}

impl FromStr for RecordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim_start_matches('#').parse().map(Self)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}
