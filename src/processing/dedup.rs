//! Identity-based deduplication of normalized records.

use std::collections::HashSet;

use crate::domain::record::NormalizedRecord;

/// Tracks identity keys seen so far; the first record with a given key wins.
///
/// One instance can span several batches, e.g. all sources of a run before
/// they are persisted.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time a record's identity key is offered.
    pub fn admit(&mut self, record: &NormalizedRecord) -> bool {
        self.seen.insert(record.identity_key().to_string())
    }

    /// Keeps first-seen records of `records`, dropping later duplicates of
    /// anything already admitted.
    pub fn dedupe(&mut self, records: Vec<NormalizedRecord>) -> Vec<NormalizedRecord> {
        records
            .into_iter()
            .filter(|record| self.admit(record))
            .collect()
    }
}

/// Deduplicates a single batch by identity key, preserving arrival order.
pub fn dedupe(records: Vec<NormalizedRecord>) -> Vec<NormalizedRecord> {
    Deduplicator::new().dedupe(records)
}
