//! Keyword search backed by a Google Custom Search style API.

use std::sync::{Arc, Once};
use std::time::Duration;

use chrono::{DateTime, Days, NaiveDate, Utc};
use html_escape::decode_html_entities;
use serde::Deserialize;
use tokio::sync::Semaphore;
use url::Url;

use crate::collectors::{CollectorError, CollectorResult, build_reqwest_client};
use crate::models::config::SearchConfig;

pub mod content;

/// Hard per-request maximum of the search API.
pub const MAX_RESULTS_PER_REQUEST: usize = 10;

static MISSING_CREDENTIALS: Once = Once::new();

/// One search result before normalization.
#[derive(Clone, Debug, PartialEq)]
pub struct RawHit {
    pub title: String,
    pub link: String,
    pub description: String,
    pub date: Option<NaiveDate>,
    /// Extracted page text; empty when extraction was skipped or failed.
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    pagemap: Option<PageMap>,
}

#[derive(Debug, Deserialize)]
struct PageMap {
    #[serde(default)]
    metatags: Vec<serde_json::Map<String, serde_json::Value>>,
}

impl Item {
    /// Publication date hint from the first metatag block.
    fn published_hint(&self) -> Option<&str> {
        self.pagemap
            .as_ref()?
            .metatags
            .first()?
            .get("article:published_time")?
            .as_str()
    }
}

/// Parses a published-date hint: a leading `YYYY-MM-DD` or an RFC 3339
/// timestamp.
pub fn parse_published_date(hint: &str) -> Option<NaiveDate> {
    let hint = hint.trim();
    if let Some(day) = hint.get(..10)
        && let Ok(date) = NaiveDate::parse_from_str(day, "%Y-%m-%d")
    {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(hint)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}

/// Whether a hit published on `date` falls inside the last `days_back` days.
///
/// Hits without a date count as recent, and `days_back == 0` disables the
/// window altogether.
pub fn is_recent(date: Option<NaiveDate>, days_back: u32, today: NaiveDate) -> bool {
    if days_back == 0 {
        return true;
    }
    let Some(date) = date else {
        return true;
    };
    match today.checked_sub_days(Days::new(u64::from(days_back))) {
        Some(limit) => date >= limit,
        None => true,
    }
}

struct Credentials {
    api_key: String,
    engine_id: String,
}

/// Domain-restricted keyword search with optional page-content extraction.
///
/// Without credentials the provider is disabled: every call returns an empty
/// list and the condition is logged once per process.
pub struct SearchProvider {
    endpoint: Url,
    credentials: Option<Credentials>,
    client: reqwest::Client,
    semaphore: Arc<Semaphore>,
}

impl SearchProvider {
    pub fn new(config: &SearchConfig) -> CollectorResult<Self> {
        let credentials = config.credentials().map(|(key, engine)| Credentials {
            api_key: key.to_string(),
            engine_id: engine.to_string(),
        });
        if credentials.is_none() {
            MISSING_CREDENTIALS.call_once(|| {
                log::warn!("Search credentials not set; search-backed sources are disabled");
            });
        }
        Ok(Self {
            endpoint: Url::parse(&config.endpoint)?,
            credentials,
            client: build_reqwest_client(Duration::from_secs(config.request_timeout_secs))?,
            semaphore: Arc::new(Semaphore::new(config.fetch_concurrency.max(1))),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.credentials.is_some()
    }

    /// Runs one search call and returns at most `min(limit, 10)` recent hits.
    ///
    /// Never fails: request and payload errors are logged and yield an empty
    /// list.
    pub async fn search(
        &self,
        query: &str,
        days_back: u32,
        limit: usize,
        extract_content: bool,
    ) -> Vec<RawHit> {
        let Some(credentials) = &self.credentials else {
            return vec![];
        };
        match self.try_search(credentials, query, days_back, limit).await {
            Ok(mut hits) => {
                if extract_content {
                    let contents = futures::future::join_all(
                        hits.iter().map(|hit| self.fetch_content(&hit.link)),
                    )
                    .await;
                    for (hit, content) in hits.iter_mut().zip(contents) {
                        hit.content = content;
                    }
                }
                hits
            }
            Err(e) => {
                log::warn!("Search failed for query '{query}': {e}");
                vec![]
            }
        }
    }

    fn request_url(&self, credentials: &Credentials, query: &str, limit: usize) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("key", &credentials.api_key)
            .append_pair("cx", &credentials.engine_id)
            .append_pair("q", query)
            .append_pair("num", &limit.min(MAX_RESULTS_PER_REQUEST).to_string())
            .append_pair("sort", "date");
        url
    }

    async fn try_search(
        &self,
        credentials: &Credentials,
        query: &str,
        days_back: u32,
        limit: usize,
    ) -> CollectorResult<Vec<RawHit>> {
        log::info!("Searching for: '{query}'");
        let res = self
            .client
            .get(self.request_url(credentials, query, limit))
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(CollectorError::Status(res.status()));
        }
        let body: SearchResponse = serde_json::from_str(&res.text().await?)?;

        let today = Utc::now().date_naive();
        let cap = limit.min(MAX_RESULTS_PER_REQUEST);
        Ok(body
            .items
            .into_iter()
            .filter(|item| !item.link.is_empty())
            .filter_map(|item| {
                let date = item.published_hint().and_then(parse_published_date);
                if !is_recent(date, days_back, today) {
                    return None;
                }
                Some(RawHit {
                    title: decode_html_entities(&item.title).trim().to_string(),
                    link: item.link,
                    description: decode_html_entities(&item.snippet).trim().to_string(),
                    date,
                    content: String::new(),
                })
            })
            .take(cap)
            .collect())
    }

    /// Fetches a hit's page and extracts its readable text.
    ///
    /// A permit from the internal [`Semaphore`] bounds simultaneous page
    /// fetches. Any failure yields an empty string.
    async fn fetch_content(&self, link: &str) -> String {
        let Ok(_permit) = self.semaphore.acquire().await else {
            return String::new();
        };
        let res = match self.client.get(link).send().await {
            Ok(res) => res,
            Err(e) => {
                log::warn!("Failed to extract content from {link}: {e}");
                return String::new();
            }
        };
        if !res.status().is_success() {
            log::warn!("Failed to extract content from {link}: {}", res.status());
            return String::new();
        }
        match res.text().await {
            Ok(html) => content::extract_text(&html),
            Err(e) => {
                log::warn!("Failed to read page {link}: {e}");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn published_date_formats() {
        assert_eq!(parse_published_date("2024-05-01"), Some(day(2024, 5, 1)));
        assert_eq!(
            parse_published_date("2024-05-01T23:10:00-03:00"),
            Some(day(2024, 5, 1))
        );
        assert_eq!(parse_published_date("ontem"), None);
        assert_eq!(parse_published_date(""), None);
    }

    #[test]
    fn undated_hits_are_recent() {
        let today = day(2024, 6, 30);
        assert!(is_recent(None, 7, today));
        assert!(is_recent(Some(day(2024, 6, 23)), 7, today));
        assert!(!is_recent(Some(day(2024, 6, 22)), 7, today));
        assert!(is_recent(Some(day(1999, 1, 1)), 0, today));
    }

    #[test]
    fn published_hint_reads_first_metatag_block() {
        let item: Item = serde_json::from_str(
            r#"{"title": "t", "link": "https://x/y",
                "pagemap": {"metatags": [{"article:published_time": "2024-05-01T10:00:00Z"}, {}]}}"#,
        )
        .unwrap();
        assert_eq!(item.published_hint(), Some("2024-05-01T10:00:00Z"));

        let item: Item = serde_json::from_str(r#"{"title": "t", "link": "https://x/y"}"#).unwrap();
        assert_eq!(item.published_hint(), None);
    }

    #[test]
    fn request_caps_num_at_provider_maximum() {
        let provider = SearchProvider::new(&SearchConfig {
            api_key: Some("key".into()),
            engine_id: Some("cx".into()),
            ..Default::default()
        })
        .unwrap();
        let credentials = provider.credentials.as_ref().unwrap();
        let url = provider.request_url(credentials, "\"ALESP\" projeto", 25);
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("num".into(), "10".into())));
        assert!(pairs.contains(&("q".into(), "\"ALESP\" projeto".into())));
        assert!(pairs.contains(&("cx".into(), "cx".into())));
    }
}
