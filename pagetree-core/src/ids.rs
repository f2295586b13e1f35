//! Response identifiers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Strictly increasing response ids, unique within one process.
///
/// Owned by whoever serves requests rather than kept in a global, so
/// independent servers (and tests) never share a sequence.
#[derive(Debug, Default)]
pub struct ResponseIds(AtomicU64);

impl ResponseIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next id. The first id issued is 1.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}
