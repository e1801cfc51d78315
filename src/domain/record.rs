//! Canonical record shape every collector converges to.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

/// Maximum number of characters kept in [`NormalizedRecord::content`].
pub const MAX_CONTENT_CHARS: usize = 2000;

/// Producing collector identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Camara,
    Senado,
    Alesp,
    Municipal,
}

impl Source {
    /// Every known source in registry order.
    pub const ALL: [Source; 4] = [
        Source::Camara,
        Source::Senado,
        Source::Alesp,
        Source::Municipal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Camara => "camara",
            Source::Senado => "senado",
            Source::Alesp => "alesp",
            Source::Municipal => "municipal",
        }
    }

    /// Jurisdiction tier the source reports on.
    pub fn level(&self) -> Level {
        match self {
            Source::Camara | Source::Senado => Level::Federal,
            Source::Alesp => Level::Estadual,
            Source::Municipal => Level::Municipal,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Source::ALL
            .into_iter()
            .find(|source| source.as_str() == value)
            .ok_or_else(|| format!("unknown source: {value}"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Federal,
    Estadual,
    Municipal,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Federal => "federal",
            Level::Estadual => "estadual",
            Level::Municipal => "municipal",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a record was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionType {
    Api,
    Search,
    Scraping,
}

impl CollectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionType::Api => "api",
            CollectionType::Search => "search",
            CollectionType::Scraping => "scraping",
        }
    }
}

impl fmt::Display for CollectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "api" => Ok(CollectionType::Api),
            "search" => Ok(CollectionType::Search),
            "scraping" => Ok(CollectionType::Scraping),
            other => Err(format!("unknown collection type: {other}")),
        }
    }
}

/// One legislative item, or one news item about a legislative item.
///
/// Fields are read-only outside the crate. The level is always derived from
/// the source, and the relevance score can only be assigned by the relevance
/// filter.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    title: String,
    description: Option<String>,
    content: Option<String>,
    link: Option<String>,
    date: Option<NaiveDate>,
    source: Source,
    level: Level,
    collection_type: CollectionType,
    relevance_score: Option<i32>,
}

impl NormalizedRecord {
    /// Creates a record, returning `None` when the trimmed title is empty.
    pub fn new(
        title: impl Into<String>,
        source: Source,
        collection_type: CollectionType,
    ) -> Option<Self> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return None;
        }
        Some(Self {
            title,
            description: None,
            content: None,
            link: None,
            date: None,
            source,
            level: source.level(),
            collection_type,
            relevance_score: None,
        })
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = non_empty(description);
        self
    }

    /// Sets the extracted text, truncated to [`MAX_CONTENT_CHARS`].
    pub fn with_content(mut self, content: Option<String>) -> Self {
        self.content =
            non_empty(content).map(|text| text.chars().take(MAX_CONTENT_CHARS).collect());
        self
    }

    pub fn with_link(mut self, link: Option<String>) -> Self {
        self.link = non_empty(link);
        self
    }

    pub fn with_date(mut self, date: Option<NaiveDate>) -> Self {
        self.date = date;
        self
    }

    pub(crate) fn with_relevance_score(mut self, score: i32) -> Self {
        if self.relevance_score.is_none() {
            self.relevance_score = Some(score);
        }
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn collection_type(&self) -> CollectionType {
        self.collection_type
    }

    pub fn relevance_score(&self) -> Option<i32> {
        self.relevance_score
    }

    /// Identity used for deduplication and idempotent persistence: the link
    /// when present, the title otherwise.
    pub fn identity_key(&self) -> &str {
        self.link().unwrap_or(&self.title)
    }

    /// Text the relevance filter searches in.
    pub fn searchable_text(&self) -> String {
        format!(
            "{} {} {}",
            self.title,
            self.description().unwrap_or_default(),
            self.content().unwrap_or_default()
        )
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
