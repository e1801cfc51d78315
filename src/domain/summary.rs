use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::record::{NormalizedRecord, Source};

/// Output of one collector for one orchestrator run.
#[derive(Clone, Debug, Serialize)]
pub struct CollectionResult {
    pub source: Source,
    pub items: Vec<NormalizedRecord>,
    pub count: usize,
    pub timestamp: DateTime<Utc>,
}

impl CollectionResult {
    pub fn new(source: Source, items: Vec<NormalizedRecord>) -> Self {
        Self {
            source,
            count: items.len(),
            items,
            timestamp: Utc::now(),
        }
    }

    pub fn empty(source: Source) -> Self {
        Self::new(source, Vec::new())
    }
}

/// Transient report of a whole collection run.
///
/// Built only through [`CollectionSummary::from_results`], so every count
/// always matches the length of the corresponding detail list.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    total_items: usize,
    per_source_counts: BTreeMap<Source, usize>,
    timestamp: DateTime<Utc>,
    details: BTreeMap<Source, Vec<NormalizedRecord>>,
}

impl CollectionSummary {
    pub fn from_results(results: Vec<CollectionResult>) -> Self {
        let mut details: BTreeMap<Source, Vec<NormalizedRecord>> = BTreeMap::new();
        for result in results {
            details.entry(result.source).or_default().extend(result.items);
        }
        let per_source_counts: BTreeMap<Source, usize> = details
            .iter()
            .map(|(source, items)| (*source, items.len()))
            .collect();
        let total_items = per_source_counts.values().sum();

        Self {
            total_items,
            per_source_counts,
            timestamp: Utc::now(),
            details,
        }
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn per_source_counts(&self) -> &BTreeMap<Source, usize> {
        &self.per_source_counts
    }

    pub fn count(&self, source: Source) -> Option<usize> {
        self.per_source_counts.get(&source).copied()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn details(&self) -> &BTreeMap<Source, Vec<NormalizedRecord>> {
        &self.details
    }

    pub fn items(&self, source: Source) -> &[NormalizedRecord] {
        self.details.get(&source).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sources that produced at least one record.
    pub fn working_sources(&self) -> Vec<Source> {
        self.per_source_counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(source, _)| *source)
            .collect()
    }
}
