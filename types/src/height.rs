//! Block height type used throughout the engine.
//!
//! Heights are supplied by the replication layer at every block boundary.
//! The engine never reads a wall clock.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A block height.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockHeight(u64);

impl BlockHeight {
    pub const GENESIS: Self = Self(0);

    pub fn new(height: u64) -> Self {
        Self(height)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Blocks elapsed since this height (relative to `now`).
    pub fn elapsed_since(&self, now: BlockHeight) -> u64 {
        now.0.saturating_sub(self.0)
    }

    /// Whether `period` blocks have passed since this height, relative to `now`.
    pub fn has_expired(&self, period: u64, now: BlockHeight) -> bool {
        now.0 >= self.0.saturating_add(period)
    }
}

impl fmt::Display for BlockHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}
