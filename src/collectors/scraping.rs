//! HTML scraping of legislative sites, used when search finds nothing.

use std::collections::HashSet;
use std::time::Duration;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::collectors::{CollectorError, CollectorResult, build_reqwest_client};
use crate::domain::record::{CollectionType, NormalizedRecord, Source};

/// Link texts that point at site tooling rather than bills.
const EXCLUDED_WORDS: [&str; 9] = [
    "pesquisa",
    "busca",
    "sobre",
    "extranet",
    "consulta",
    "acesse",
    "clique",
    "saiba mais",
    "historia",
];

/// Href fragments typical of bill pages.
const BILL_PATHS: [&str; 4] = ["/proposicao", "/materia", "/pl-", "/pec-"];

/// Scrapes candidate listing pages of a legislative site for bill links.
#[derive(Clone, Debug)]
pub struct HtmlScraper {
    pages: Vec<Url>,
    client: reqwest::Client,
    bill_pattern: Regex,
}

impl HtmlScraper {
    pub fn new(pages: Vec<Url>) -> CollectorResult<Self> {
        Ok(Self {
            pages,
            client: build_reqwest_client(Duration::from_secs(15))?,
            bill_pattern: Regex::new(
                r"(?i)\b(pl|pec|plc)\s+n?º?\s*\d+|\bprojeto\b|\blei\s+n[º.]|\bmat[eé]ria\b|\bproposi[cç][aã]o\b",
            )
            .map_err(|e| CollectorError::Build(e.to_string()))?,
        })
    }

    /// Listing pages of the São Paulo legislative assembly.
    pub fn alesp(base_url: &str) -> CollectorResult<Self> {
        let base = Url::parse(base_url)?;
        let pages = [
            "processo-legislativo",
            "leis",
            "processo-legislativo/materias",
            "processo-legislativo/proposicoes",
            "legislacao",
        ]
        .iter()
        .map(|path| base.join(path))
        .collect::<Result<Vec<_>, _>>()?;
        Self::new(pages)
    }

    /// Tries each page in order and returns the bill links of the first page
    /// that yields any, capped at `limit`.
    pub async fn scrape(&self, source: Source, limit: usize) -> Vec<NormalizedRecord> {
        for page in &self.pages {
            let Some(document) = self.fetch_html(page).await else {
                continue;
            };
            let links = self.bill_links(&document, page, limit);
            if !links.is_empty() {
                log::info!("Scraped {} bill links from {page}", links.len());
                return links
                    .into_iter()
                    .filter_map(|(title, link)| {
                        NormalizedRecord::new(title.clone(), source, CollectionType::Scraping)
                            .map(|r| r.with_description(Some(title)).with_link(Some(link)))
                    })
                    .collect();
            }
        }
        log::warn!("No bill links found; the site may be unavailable or its layout changed");
        vec![]
    }

    async fn fetch_html(&self, url: &Url) -> Option<Html> {
        let res = match self.client.get(url.as_str()).send().await {
            Ok(res) => res,
            Err(e) => {
                log::warn!("Failed to get URL {url}: {e}");
                return None;
            }
        };
        if !res.status().is_success() {
            log::warn!("Failed to get URL {url}: {}", res.status());
            return None;
        }
        let text = res.text().await.ok()?;
        Some(Html::parse_document(&text))
    }

    /// Table rows first, then list items, then any anchor on the page.
    fn bill_links(&self, document: &Html, page: &Url, limit: usize) -> Vec<(String, String)> {
        let strategies = ["table tr a[href]", "ul li a[href], ol li a[href]", "a[href]"];
        for css in strategies {
            let Ok(selector) = Selector::parse(css) else {
                continue;
            };
            let mut seen = HashSet::new();
            let links: Vec<(String, String)> = document
                .select(&selector)
                .filter_map(|anchor| self.candidate(anchor, page))
                .filter(|(_, link)| seen.insert(link.clone()))
                .take(limit)
                .collect();
            if !links.is_empty() {
                return links;
            }
        }
        vec![]
    }

    fn candidate(&self, anchor: ElementRef<'_>, page: &Url) -> Option<(String, String)> {
        let href = anchor.value().attr("href")?;
        let title = anchor
            .text()
            .flat_map(str::split_whitespace)
            .collect::<Vec<_>>()
            .join(" ");
        let lower = title.to_lowercase();
        let href_lower = href.to_lowercase();

        if title.chars().count() <= 10
            || EXCLUDED_WORDS.iter().any(|word| lower.contains(word))
            || href_lower.ends_with("/pesquisa-proposicoes")
        {
            return None;
        }
        let looks_like_bill = self.bill_pattern.is_match(&title)
            || BILL_PATHS.iter().any(|path| href_lower.contains(path))
            || href_lower.contains("processo");
        if !looks_like_bill {
            return None;
        }

        let link = page.join(href).ok()?;
        Some((title, link.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scraper() -> HtmlScraper {
        HtmlScraper::alesp("https://www.al.sp.gov.br/").unwrap()
    }

    fn page() -> Url {
        Url::parse("https://www.al.sp.gov.br/processo-legislativo").unwrap()
    }

    #[test]
    fn alesp_pages_are_resolved_against_base() {
        let scraper = scraper();
        assert_eq!(scraper.pages.len(), 5);
        assert_eq!(
            scraper.pages[0].as_str(),
            "https://www.al.sp.gov.br/processo-legislativo"
        );
    }

    #[test]
    fn table_rows_win_over_other_links() {
        let html = Html::parse_document(
            r#"<html><body>
                <ul><li><a href="/propositura/?id=9">Projeto de lei 9/2024 em lista</a></li></ul>
                <table>
                  <tr><th>Número</th></tr>
                  <tr><td><a href="/propositura/?id=1">PL 123/2024 - Isenção de IPVA</a></td></tr>
                  <tr><td><a href="/pesquisa">Pesquisa de proposições avançada</a></td></tr>
                </table>
            </body></html>"#,
        );
        let links = scraper().bill_links(&html, &page(), 10);
        assert_eq!(
            links,
            vec![(
                "PL 123/2024 - Isenção de IPVA".to_string(),
                "https://www.al.sp.gov.br/propositura/?id=1".to_string()
            )]
        );
    }

    #[test]
    fn falls_back_to_any_anchor_and_respects_limit() {
        let html = Html::parse_document(
            r#"<html><body><div>
                <a href="materia/1">Matéria do transporte público</a>
                <a href="materia/2">Matéria da saúde da família</a>
                <a href="/contato">Fale conosco agora</a>
            </div></body></html>"#,
        );
        let links = scraper().bill_links(&html, &page(), 1);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].1, "https://www.al.sp.gov.br/materia/1");
    }

    #[test]
    fn short_and_tooling_links_are_rejected() {
        let html = Html::parse_document(
            r#"<html><body>
                <a href="/pl-1">PL 1</a>
                <a href="/processo-legislativo/consulta">Consulta de processos legislativos</a>
            </body></html>"#,
        );
        assert!(scraper().bill_links(&html, &page(), 10).is_empty());
    }
}
