//! Collector for the Câmara dos Deputados open data REST API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::collectors::{CollectorError, CollectorResult, SourceCollector, build_reqwest_client};
use crate::domain::record::{CollectionType, NormalizedRecord, Source};
use crate::models::config::CamaraConfig;

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    dados: Vec<Proposition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Proposition {
    sigla_tipo: Option<String>,
    numero: Option<i64>,
    ano: Option<i64>,
    ementa: Option<String>,
    uri: Option<String>,
    data_apresentacao: Option<String>,
}

/// Largest page the listing endpoint accepts.
const MAX_PAGE_SIZE: usize = 100;

/// Parses the leading `YYYY-MM-DD` of an API timestamp.
pub(crate) fn parse_day(value: &str) -> Option<NaiveDate> {
    let day = value.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Whether the item was presented on or after `since`. Undated items are not.
fn presented_since(item: &Proposition, since: NaiveDate) -> bool {
    item.data_apresentacao
        .as_deref()
        .and_then(parse_day)
        .is_some_and(|day| day >= since)
}

/// REST collector for `/proposicoes`.
///
/// The listing is requested with a `dataInicio` filter, at most
/// [`MAX_PAGE_SIZE`] items per page. The endpoint is known to reject that
/// parameter at times with `400 Bad Request`; in that case the listing is
/// requested again without it and the recency window is applied to the
/// returned items instead.
pub struct ApiCollector {
    base_url: Url,
    bill_type: String,
    client: reqwest::Client,
}

impl ApiCollector {
    pub fn new(config: &CamaraConfig) -> CollectorResult<Self> {
        Ok(Self {
            base_url: Url::parse(&config.base_url)?,
            bill_type: config.bill_type.clone(),
            client: build_reqwest_client(Duration::from_secs(config.request_timeout_secs))?,
        })
    }

    /// Builds the URL of listing page `page`, optionally filtered by start
    /// date.
    fn list_url(
        &self,
        page: usize,
        page_size: usize,
        since: Option<NaiveDate>,
    ) -> CollectorResult<Url> {
        let mut url = self.base_url.join("proposicoes")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("pagina", &page.to_string())
                .append_pair("itens", &page_size.to_string())
                .append_pair("ordem", "DESC")
                .append_pair("ordenarPor", "id")
                .append_pair("siglaTipo", &self.bill_type);
            if let Some(since) = since {
                pairs.append_pair("dataInicio", &since.format("%Y-%m-%d").to_string());
            }
        }
        Ok(url)
    }

    async fn fetch_page(&self, url: Url) -> CollectorResult<Vec<Proposition>> {
        let res = self.client.get(url).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(CollectorError::Status(status));
        }
        let text = res.text().await?;
        let body: ListResponse = serde_json::from_str(&text)?;
        Ok(body.dados)
    }

    /// Walks the listing page by page until `limit` records are gathered or
    /// a page comes back short.
    ///
    /// With `date_filter` the window is applied by the server. Without it,
    /// `window` is applied to each page here, and paging also stops at the
    /// first page with nothing in range, since the listing is newest first.
    async fn fetch_records(
        &self,
        limit: usize,
        date_filter: Option<NaiveDate>,
        window: Option<NaiveDate>,
    ) -> CollectorResult<Vec<NormalizedRecord>> {
        let page_size = limit.clamp(1, MAX_PAGE_SIZE);
        let mut records = Vec::new();
        let mut page = 1;
        loop {
            let items = self
                .fetch_page(self.list_url(page, page_size, date_filter)?)
                .await?;
            let fetched = items.len();
            let before = records.len();
            records.extend(
                items
                    .into_iter()
                    .filter(|item| window.is_none_or(|since| presented_since(item, since)))
                    .filter_map(|item| self.to_record(item)),
            );

            let exhausted = fetched < page_size || (window.is_some() && records.len() == before);
            if records.len() >= limit || exhausted {
                break;
            }
            page += 1;
        }
        records.truncate(limit);
        Ok(records)
    }

    async fn try_collect(&self, days_back: u32, limit: usize) -> CollectorResult<Vec<NormalizedRecord>> {
        let since = Utc::now()
            .date_naive()
            .checked_sub_days(Days::new(u64::from(days_back)))
            .unwrap_or(NaiveDate::MIN);

        match self.fetch_records(limit, Some(since), None).await {
            Err(CollectorError::Status(StatusCode::BAD_REQUEST)) => {
                log::warn!("Camara API rejected the date filter, retrying without it");
                self.fetch_records(limit, None, Some(since)).await
            }
            result => result,
        }
    }

    fn to_record(&self, item: Proposition) -> Option<NormalizedRecord> {
        let (Some(numero), Some(ano)) = (item.numero, item.ano) else {
            log::debug!("Skipping Camara item without number/year: {:?}", item.uri);
            return None;
        };
        let sigla = item.sigla_tipo.as_deref().unwrap_or(&self.bill_type);
        let record = NormalizedRecord::new(
            format!("{sigla} {numero}/{ano}"),
            Source::Camara,
            CollectionType::Api,
        )?
        .with_description(item.ementa)
        .with_link(item.uri)
        .with_date(item.data_apresentacao.as_deref().and_then(parse_day));
        Some(record)
    }
}

#[async_trait]
impl SourceCollector for ApiCollector {
    fn source(&self) -> Source {
        Source::Camara
    }

    async fn collect(&self, days_back: u32, limit: usize) -> Vec<NormalizedRecord> {
        log::info!("Starting Camara collection: days_back={days_back}, limit={limit}");
        match self.try_collect(days_back, limit).await {
            Ok(records) => {
                log::info!("Camara collection finished with {} items", records.len());
                records
            }
            Err(e) => {
                log::warn!("Error collecting from Camara: {e}");
                vec![]
            }
        }
    }
}
