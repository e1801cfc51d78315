use crate::db::{DbConnection, DbPool};
use crate::domain::record::{NormalizedRecord, Source};

pub mod errors;
pub mod record;
pub mod schema;

use errors::RepositoryResult;

pub trait RecordReader {
    fn list_records(&self) -> RepositoryResult<Vec<NormalizedRecord>>;
    fn list_records_by_source(&self, source: Source) -> RepositoryResult<Vec<NormalizedRecord>>;
    fn count_records(&self) -> RepositoryResult<i64>;
}

/// Outcome of writing a batch of records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpsertStats {
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl UpsertStats {
    pub fn add(&mut self, other: UpsertStats) {
        self.created += other.created;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Idempotent persistence of normalized records.
pub trait RecordWriter: Send + Sync {
    /// Inserts `record` unless one with the same identity key is already
    /// stored. Returns `true` when a row was created.
    fn upsert(&self, record: &NormalizedRecord) -> RepositoryResult<bool>;

    /// Upserts one source's batch. Failing records are logged and counted;
    /// only an unreachable store fails the whole batch.
    fn upsert_batch(&self, records: &[&NormalizedRecord]) -> RepositoryResult<UpsertStats> {
        let mut stats = UpsertStats::default();
        for record in records {
            match self.upsert(record) {
                Ok(true) => stats.created += 1,
                Ok(false) => stats.skipped += 1,
                Err(e) if e.is_unavailable() => return Err(e),
                Err(e) => {
                    log::error!("Failed to persist '{}': {e}", record.identity_key());
                    stats.failed += 1;
                }
            }
        }
        Ok(stats)
    }
}

/// Diesel-backed repository over a pooled SQLite database.
#[derive(Clone)]
pub struct DieselRepository {
    pool: DbPool,
}

impl DieselRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> RepositoryResult<DbConnection> {
        Ok(self.pool.get()?)
    }
}
