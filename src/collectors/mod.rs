use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::record::{NormalizedRecord, Source};
use crate::models::config::ServerConfig;
use crate::search::SearchProvider;

pub mod api;
pub mod scraping;
pub mod search;

use api::ApiCollector;
use scraping::HtmlScraper;
use search::{SearchCollector, SearchParams};

/// User agent sent by every collector.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("failed to build collector: {0}")]
    Build(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

pub type CollectorResult<T> = Result<T, CollectorError>;

/// A single legislative data source that produces [`NormalizedRecord`]s.
///
/// Implementations never fail across this boundary: network errors,
/// malformed payloads and rate limits are logged and yield an empty list.
#[async_trait]
pub trait SourceCollector: Send + Sync {
    /// Identity stamped on every produced record.
    fn source(&self) -> Source;

    /// Returns at most `limit` records from the last `days_back` days.
    async fn collect(&self, days_back: u32, limit: usize) -> Vec<NormalizedRecord>;
}

/// Builds the HTTP client owned by a single collector.
pub fn build_reqwest_client(timeout: Duration) -> CollectorResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| CollectorError::Build(e.to_string()))
}

/// Constructs the collector registered for `source`.
///
/// Every collector gets its own HTTP client so no session state is shared
/// between concurrently running sources.
pub fn build_collector(
    source: Source,
    config: &ServerConfig,
) -> CollectorResult<Arc<dyn SourceCollector>> {
    let collector: Arc<dyn SourceCollector> = match source {
        Source::Camara => Arc::new(ApiCollector::new(&config.camara)?),
        Source::Senado => Arc::new(SearchCollector::new(
            SearchParams::senado(),
            SearchProvider::new(&config.search)?,
        )),
        Source::Alesp => {
            let mut params = SearchParams::alesp();
            if config.alesp.scrape_fallback {
                params = params.with_fallback(HtmlScraper::alesp(&config.alesp.base_url)?);
            }
            Arc::new(SearchCollector::new(
                params,
                SearchProvider::new(&config.search)?,
            ))
        }
        Source::Municipal => Arc::new(SearchCollector::new(
            SearchParams::municipal(&config.municipal.region, &config.municipal.cities),
            SearchProvider::new(&config.search)?,
        )),
    };
    Ok(collector)
}

/// Builds the collectors for every known source, in registry order.
pub fn build_registry(config: &ServerConfig) -> CollectorResult<Vec<Arc<dyn SourceCollector>>> {
    Source::ALL
        .into_iter()
        .map(|source| build_collector(source, config))
        .collect()
}
