//! Concurrent fan-out over every registered collector and fan-in into a
//! [`CollectionSummary`].

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;

use crate::collectors::{CollectorError, SourceCollector, build_registry};
use crate::domain::record::{NormalizedRecord, Source};
use crate::domain::summary::{CollectionResult, CollectionSummary};
use crate::models::config::ServerConfig;
use crate::processing::dedup::{Deduplicator, dedupe};
use crate::processing::relevance::RelevanceFilter;
use crate::repository::{RecordWriter, UpsertStats};
use crate::repository::errors::RepositoryError;

/// Default upper bound for a single collector task.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("failed to build collectors: {0}")]
    Collector(#[from] CollectorError),
    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(#[source] RepositoryError),
}

pub struct CollectionOrchestrator {
    collectors: Vec<Arc<dyn SourceCollector>>,
    filter: RelevanceFilter,
    gateway: Option<Arc<dyn RecordWriter>>,
    task_timeout: Duration,
}

impl CollectionOrchestrator {
    pub fn new(collectors: Vec<Arc<dyn SourceCollector>>) -> Self {
        Self {
            collectors,
            filter: RelevanceFilter::default(),
            gateway: None,
            task_timeout: DEFAULT_TASK_TIMEOUT,
        }
    }

    /// Registers every known source with the configured keywords and task
    /// timeout. No persistence gateway is attached.
    pub fn from_config(config: &ServerConfig) -> Result<Self, OrchestratorError> {
        Ok(Self::new(build_registry(config)?)
            .with_filter(RelevanceFilter::new(&config.collection.keywords))
            .with_task_timeout(config.collection.task_timeout()))
    }

    pub fn with_filter(mut self, filter: RelevanceFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn RecordWriter>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// Runs one collection across all registered sources.
    ///
    /// At most `min(sources, max_workers)` collectors run at a time. A
    /// collector that panics or exceeds the task timeout contributes an empty
    /// result; its siblings are unaffected. The only run-level error is an
    /// unreachable persistence gateway.
    pub async fn run(
        &self,
        days_back: u32,
        limit: usize,
        include_municipal: bool,
        max_workers: usize,
    ) -> Result<CollectionSummary, OrchestratorError> {
        let collectors: Vec<Arc<dyn SourceCollector>> = self
            .collectors
            .iter()
            .filter(|c| include_municipal || c.source() != Source::Municipal)
            .cloned()
            .collect();
        let workers = collectors.len().min(max_workers).max(1);
        log::info!(
            "Starting collection of {} sources with {workers} workers: days_back={days_back}, limit={limit}",
            collectors.len()
        );

        let semaphore = Arc::new(Semaphore::new(workers));
        let handles = collectors
            .into_iter()
            .map(|collector| {
                let source = collector.source();
                let semaphore = semaphore.clone();
                let timeout = self.task_timeout;
                let handle = tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return vec![];
                    };
                    match tokio::time::timeout(timeout, collector.collect(days_back, limit)).await
                    {
                        Ok(records) => records,
                        Err(_) => {
                            log::warn!("{source} collection timed out after {timeout:?}");
                            vec![]
                        }
                    }
                });
                (source, handle)
            })
            .collect::<Vec<_>>();

        let mut results = Vec::with_capacity(handles.len());
        for (source, handle) in handles {
            let records = match handle.await {
                Ok(records) => records,
                Err(e) => {
                    log::error!("{source} collection task failed: {e}");
                    vec![]
                }
            };
            let collected = records.len();
            let relevant = dedupe(self.filter.filter(records));
            log::info!("{source}: {} of {collected} items relevant", relevant.len());
            results.push(CollectionResult::new(source, relevant));
        }

        if let Some(gateway) = &self.gateway {
            let stats = persist(gateway.as_ref(), &results)?;
            log::info!(
                "Persisted run: {} created, {} skipped as duplicates, {} failed",
                stats.created,
                stats.skipped,
                stats.failed
            );
        }

        let summary = CollectionSummary::from_results(results);
        log::info!(
            "Collection finished with {} items from {:?}",
            summary.total_items(),
            summary.working_sources()
        );
        Ok(summary)
    }
}

/// Writes each source's batch through `gateway`, every identity key at most
/// once per run.
///
/// A batch that fails as a whole is logged and counted as failed; an
/// unreachable gateway aborts the write.
pub fn persist(
    gateway: &dyn RecordWriter,
    results: &[CollectionResult],
) -> Result<UpsertStats, OrchestratorError> {
    let mut seen = Deduplicator::new();
    let mut stats = UpsertStats::default();
    for result in results {
        let batch: Vec<&NormalizedRecord> = result
            .items
            .iter()
            .filter(|record| seen.admit(record))
            .collect();
        match gateway.upsert_batch(&batch) {
            Ok(batch_stats) => stats.add(batch_stats),
            Err(e) if e.is_unavailable() => {
                return Err(OrchestratorError::PersistenceUnavailable(e));
            }
            Err(e) => {
                log::error!("Failed to persist {} batch: {e}", result.source);
                stats.failed += batch.len();
            }
        }
    }
    Ok(stats)
}
