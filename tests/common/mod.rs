//! Helpers for integration tests.
#![allow(dead_code)]

use legis_crawlers::db::{DbPool, establish_connection_pool};
use legis_crawlers::domain::record::{CollectionType, NormalizedRecord, Source};
use tempfile::TempDir;

/// Temporary database used in integration tests.
pub struct TestDb {
    // Removed, together with the WAL files, when dropped.
    _dir: TempDir,
    pool: DbPool,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir.");
        let path = dir.path().join("legis.db");
        let pool = establish_connection_pool(path.to_str().expect("Non UTF-8 temp path."))
            .expect("Failed to establish SQLite connection.");
        TestDb { _dir: dir, pool }
    }

    pub fn pool(&self) -> DbPool {
        self.pool.clone()
    }
}

pub fn record(source: Source, title: &str, link: Option<&str>) -> NormalizedRecord {
    NormalizedRecord::new(title, source, CollectionType::Search)
        .expect("Non-empty title.")
        .with_link(link.map(str::to_string))
}
