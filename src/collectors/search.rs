//! Search-backed collectors for sources without a usable official API.

use async_trait::async_trait;

use crate::collectors::SourceCollector;
use crate::collectors::scraping::HtmlScraper;
use crate::domain::record::{CollectionType, NormalizedRecord, Source};
use crate::processing::dedup::dedupe;
use crate::search::{RawHit, SearchProvider};

/// Hits requested from the provider per query.
const HITS_PER_QUERY: usize = 5;

/// Trusted national news outlets.
const NATIONAL_DOMAINS: [&str; 6] = [
    "g1.globo.com",
    "folha.uol.com.br",
    "estadao.com.br",
    "oglobo.globo.com",
    "uol.com.br",
    "cartacapital.com.br",
];

/// Outlets trusted for municipal coverage of the region.
const REGIONAL_DOMAINS: [&str; 6] = [
    "g1.globo.com",
    "folha.uol.com.br",
    "estadao.com.br",
    "oglobo.globo.com",
    "uol.com.br",
    "portalvale.com.br",
];

/// Source-specific rule deciding whether a hit is kept.
#[derive(Clone, Debug)]
pub enum Acceptance {
    /// Title, snippet or content must mention at least one of the terms.
    MentionsAny(Vec<String>),
    /// Links on `host` must live under `path`, e.g. a state section.
    RegionalPath { host: String, path: String },
}

impl Acceptance {
    pub fn accepts(&self, hit: &RawHit) -> bool {
        match self {
            Acceptance::MentionsAny(terms) => {
                let text =
                    format!("{} {} {}", hit.title, hit.description, hit.content).to_lowercase();
                terms.iter().any(|term| text.contains(&term.to_lowercase()))
            }
            Acceptance::RegionalPath { host, path } => {
                let link = hit.link.to_lowercase();
                !link.contains(host.as_str()) || link.contains(path.as_str())
            }
        }
    }
}

/// Queries, domain allow-list and acceptance rules of one search-backed
/// source.
#[derive(Clone, Debug)]
pub struct SearchParams {
    pub source: Source,
    pub terms: Vec<String>,
    pub domains: Vec<String>,
    pub acceptance: Vec<Acceptance>,
    pub hits_per_query: usize,
    pub extract_content: bool,
    pub fallback: Option<HtmlScraper>,
}

impl SearchParams {
    pub fn new(source: Source, terms: Vec<String>, domains: Vec<String>) -> Self {
        Self {
            source,
            terms,
            domains,
            acceptance: vec![],
            hits_per_query: HITS_PER_QUERY,
            extract_content: true,
            fallback: None,
        }
    }

    pub fn senado() -> Self {
        Self::new(
            Source::Senado,
            strings(&[
                r#""Senado Federal" "projeto de lei""#,
                r#""Senado" "senador" "aprova""#,
                r#""Senado Federal" "matéria" "tramitação""#,
            ]),
            strings(&NATIONAL_DOMAINS),
        )
        .with_acceptance(Acceptance::MentionsAny(strings(&["senado", "senador"])))
    }

    pub fn alesp() -> Self {
        Self::new(
            Source::Alesp,
            strings(&[
                r#""ALESP" "projeto de lei" "assembleia legislativa""#,
                r#""ALESP" "deputado estadual" "aprova""#,
                r#""assembleia legislativa SP" "projeto""#,
            ]),
            strings(&NATIONAL_DOMAINS),
        )
        .with_acceptance(sao_paulo_section())
    }

    /// Region-wide queries plus one query for each of the first two cities.
    pub fn municipal(region: &str, cities: &[String]) -> Self {
        let mut terms = vec![
            format!(r#""{region}" "projeto de lei" "câmara municipal""#),
            format!(r#""{region}" "vereadores" "aprova""#),
        ];
        terms.extend(
            cities
                .iter()
                .take(2)
                .map(|city| format!(r#""{city}" "projeto de lei" "câmara""#)),
        );
        Self::new(Source::Municipal, terms, strings(&REGIONAL_DOMAINS))
            .with_acceptance(sao_paulo_section())
    }

    pub fn with_acceptance(mut self, rule: Acceptance) -> Self {
        self.acceptance.push(rule);
        self
    }

    pub fn with_fallback(mut self, scraper: HtmlScraper) -> Self {
        self.fallback = Some(scraper);
        self
    }

    pub fn with_content_extraction(mut self, extract: bool) -> Self {
        self.extract_content = extract;
        self
    }

    /// Full queries: each term restricted to the domain allow-list.
    pub fn queries(&self) -> Vec<String> {
        let sites = self
            .domains
            .iter()
            .map(|domain| format!("site:{domain}"))
            .collect::<Vec<_>>()
            .join(" OR ");
        self.terms
            .iter()
            .map(|term| {
                if sites.is_empty() {
                    term.clone()
                } else {
                    format!("{term} ({sites})")
                }
            })
            .collect()
    }

    fn accepts(&self, hit: &RawHit) -> bool {
        self.acceptance.iter().all(|rule| rule.accepts(hit))
    }
}

fn sao_paulo_section() -> Acceptance {
    Acceptance::RegionalPath {
        host: "g1.globo.com".into(),
        path: "/sp/".into(),
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Collector that discovers items through domain-restricted news search.
pub struct SearchCollector {
    params: SearchParams,
    provider: SearchProvider,
}

impl SearchCollector {
    pub fn new(params: SearchParams, provider: SearchProvider) -> Self {
        Self { params, provider }
    }

    fn to_record(&self, hit: RawHit) -> Option<NormalizedRecord> {
        let record = NormalizedRecord::new(hit.title, self.params.source, CollectionType::Search)?
            .with_description(Some(hit.description))
            .with_content(Some(hit.content))
            .with_link(Some(hit.link))
            .with_date(hit.date);
        Some(record)
    }
}

#[async_trait]
impl SourceCollector for SearchCollector {
    fn source(&self) -> Source {
        self.params.source
    }

    async fn collect(&self, days_back: u32, limit: usize) -> Vec<NormalizedRecord> {
        let source = self.params.source;
        log::info!("Starting {source} collection");

        let queries = self.params.queries();
        let tasks = queries.iter().map(|query| {
            self.provider.search(
                query,
                days_back,
                self.params.hits_per_query,
                self.params.extract_content,
            )
        });
        let hits = futures::future::join_all(tasks).await;

        let records = hits
            .into_iter()
            .flatten()
            .filter(|hit| self.params.accepts(hit))
            .filter_map(|hit| self.to_record(hit))
            .collect::<Vec<_>>();
        let mut records = dedupe(records);
        records.truncate(limit);

        if records.is_empty()
            && let Some(scraper) = &self.params.fallback
        {
            log::info!("{source} search found nothing, falling back to site scraping");
            records = scraper.scrape(source, limit).await;
        }

        log::info!("{source} collection finished with {} items", records.len());
        records
    }
}
