use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use legis_crawlers::collectors::SourceCollector;
use legis_crawlers::domain::record::{NormalizedRecord, Source};
use legis_crawlers::processing::orchestrator::{CollectionOrchestrator, OrchestratorError};
use legis_crawlers::processing::relevance::RELEVANCE_SCORE;
use legis_crawlers::repository::{DieselRepository, RecordReader};

mod common;

use common::{TestDb, record};

/// Tracks how many collectors are running at the same time.
#[derive(Default)]
struct Gauge {
    running: AtomicUsize,
    peak: AtomicUsize,
}

enum Behavior {
    Returns(Vec<NormalizedRecord>),
    Panics,
    Hangs,
    Occupies(Arc<Gauge>, Vec<NormalizedRecord>),
}

struct StubCollector {
    source: Source,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl StubCollector {
    fn new(source: Source, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            source,
            behavior,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl SourceCollector for StubCollector {
    fn source(&self) -> Source {
        self.source
    }

    async fn collect(&self, _days_back: u32, limit: usize) -> Vec<NormalizedRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Returns(records) => records.iter().take(limit).cloned().collect(),
            Behavior::Panics => panic!("collector exploded"),
            Behavior::Hangs => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                vec![]
            }
            Behavior::Occupies(gauge, records) => {
                let running = gauge.running.fetch_add(1, Ordering::SeqCst) + 1;
                gauge.peak.fetch_max(running, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                gauge.running.fetch_sub(1, Ordering::SeqCst);
                records.clone()
            }
        }
    }
}

fn stub(source: Source, behavior: Behavior) -> Arc<dyn SourceCollector> {
    StubCollector::new(source, behavior)
}

fn relevant(source: Source, n: usize) -> Vec<NormalizedRecord> {
    (0..n)
        .map(|i| {
            record(
                source,
                &format!("Projeto reduz imposto {i}"),
                Some(&format!("https://example.com/{source}/{i}")),
            )
        })
        .collect()
}

#[tokio::test]
async fn failing_sources_do_not_affect_siblings() {
    let orchestrator = CollectionOrchestrator::new(vec![
        stub(Source::Camara, Behavior::Returns(relevant(Source::Camara, 3))),
        stub(Source::Senado, Behavior::Panics),
        stub(Source::Alesp, Behavior::Hangs),
        stub(Source::Municipal, Behavior::Returns(relevant(Source::Municipal, 2))),
    ])
    .with_task_timeout(Duration::from_millis(200));

    let summary = orchestrator.run(30, 10, true, 10).await.unwrap();

    assert_eq!(summary.count(Source::Camara), Some(3));
    assert_eq!(summary.count(Source::Senado), Some(0));
    assert_eq!(summary.count(Source::Alesp), Some(0));
    assert_eq!(summary.count(Source::Municipal), Some(2));
    assert_eq!(summary.total_items(), 5);
    assert_eq!(
        summary.working_sources(),
        vec![Source::Camara, Source::Municipal]
    );
    for (source, count) in summary.per_source_counts() {
        assert_eq!(*count, summary.items(*source).len());
    }
}

#[tokio::test]
async fn municipal_is_not_run_when_excluded() {
    let municipal =
        StubCollector::new(Source::Municipal, Behavior::Returns(relevant(Source::Municipal, 2)));
    let orchestrator = CollectionOrchestrator::new(vec![
        stub(Source::Camara, Behavior::Returns(relevant(Source::Camara, 1))),
        municipal.clone() as Arc<dyn SourceCollector>,
    ]);

    let summary = orchestrator.run(30, 10, false, 10).await.unwrap();

    assert_eq!(municipal.calls.load(Ordering::SeqCst), 0);
    assert_eq!(summary.count(Source::Municipal), None);
    assert_eq!(summary.total_items(), 1);
}

#[tokio::test]
async fn single_worker_still_runs_every_source() {
    let collectors: Vec<Arc<dyn SourceCollector>> = Source::ALL
        .into_iter()
        .map(|source| stub(source, Behavior::Returns(relevant(source, 2))))
        .collect();

    let summary = CollectionOrchestrator::new(collectors)
        .run(30, 10, true, 1)
        .await
        .unwrap();

    assert_eq!(summary.total_items(), 8);
}

#[tokio::test]
async fn running_collectors_never_exceed_max_workers() {
    let gauge = Arc::new(Gauge::default());
    let collectors: Vec<Arc<dyn SourceCollector>> = Source::ALL
        .into_iter()
        .map(|source| stub(source, Behavior::Occupies(gauge.clone(), relevant(source, 1))))
        .collect();

    let summary = CollectionOrchestrator::new(collectors)
        .run(30, 10, true, 2)
        .await
        .unwrap();

    let peak = gauge.peak.load(Ordering::SeqCst);
    assert!((1..=2).contains(&peak), "peak concurrency was {peak}");
    assert_eq!(summary.total_items(), 4);
}

#[tokio::test]
async fn timed_out_collector_releases_its_worker() {
    let orchestrator = CollectionOrchestrator::new(vec![
        stub(Source::Camara, Behavior::Hangs),
        stub(Source::Senado, Behavior::Returns(relevant(Source::Senado, 1))),
    ])
    .with_task_timeout(Duration::from_millis(200));

    let summary = orchestrator.run(30, 10, true, 1).await.unwrap();

    assert_eq!(summary.count(Source::Camara), Some(0));
    assert_eq!(summary.count(Source::Senado), Some(1));
}

#[tokio::test]
async fn irrelevant_and_duplicate_items_are_dropped() {
    let records = vec![
        record(Source::Senado, "Senado aprova aumento do salário", Some("https://a/1")),
        record(Source::Senado, "Senado homenageia atleta", Some("https://a/2")),
        record(Source::Senado, "Senado debate imposto", Some("https://a/1")),
    ];
    let orchestrator =
        CollectionOrchestrator::new(vec![stub(Source::Senado, Behavior::Returns(records))]);

    let summary = orchestrator.run(30, 10, true, 10).await.unwrap();

    let items = summary.items(Source::Senado);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title(), "Senado aprova aumento do salário");
    assert_eq!(items[0].relevance_score(), Some(RELEVANCE_SCORE));
}

#[tokio::test]
async fn records_are_persisted_once_across_runs() {
    let db = TestDb::new();
    let repo = Arc::new(DieselRepository::new(db.pool()));
    let mut shared = relevant(Source::Senado, 2);
    shared.push(record(Source::Senado, "Imposto em pauta", Some("https://example.com/camara/0")));
    let orchestrator = CollectionOrchestrator::new(vec![
        stub(Source::Camara, Behavior::Returns(relevant(Source::Camara, 2))),
        stub(Source::Senado, Behavior::Returns(shared)),
    ])
    .with_gateway(repo.clone());

    let first = orchestrator.run(30, 10, true, 10).await.unwrap();
    assert_eq!(first.total_items(), 5);
    assert_eq!(repo.count_records().unwrap(), 4);

    orchestrator.run(30, 10, true, 10).await.unwrap();
    assert_eq!(repo.count_records().unwrap(), 4);
}

#[tokio::test]
async fn unreachable_gateway_fails_the_run() {
    let pool = Pool::builder()
        .min_idle(Some(0))
        .connection_timeout(Duration::from_millis(250))
        .build(ConnectionManager::<SqliteConnection>::new(
            "/nonexistent-directory/legis.db",
        ))
        .unwrap();
    let orchestrator = CollectionOrchestrator::new(vec![stub(
        Source::Camara,
        Behavior::Returns(relevant(Source::Camara, 1)),
    )])
    .with_gateway(Arc::new(DieselRepository::new(pool)));

    let result = orchestrator.run(30, 10, true, 10).await;

    assert!(matches!(
        result,
        Err(OrchestratorError::PersistenceUnavailable(_))
    ));
}
