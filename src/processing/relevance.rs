//! Keyword relevance gate applied to every source's batch.

use crate::domain::record::NormalizedRecord;

/// Score assigned to every record that passes the gate.
///
/// Scoring is pass/fail: matching more keywords does not raise the score.
pub const RELEVANCE_SCORE: i32 = 10;

/// Topics the downstream audience cares about: taxes, benefits, labor,
/// health, education and wages.
pub const DEFAULT_KEYWORDS: [&str; 19] = [
    "imposto",
    "taxa",
    "tributo",
    "IPVA",
    "IPI",
    "ICMS",
    "aumento",
    "redução",
    "benefício",
    "auxílio",
    "bolsa",
    "transporte",
    "educação",
    "saúde",
    "previdência",
    "salário",
    "mínimo",
    "trabalho",
    "emprego",
];

#[derive(Clone, Debug)]
pub struct RelevanceFilter {
    keywords: Vec<String>,
}

impl Default for RelevanceFilter {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS)
    }
}

impl RelevanceFilter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Whether any keyword occurs in the record's title, description or
    /// content, ignoring case.
    pub fn is_relevant(&self, record: &NormalizedRecord) -> bool {
        let text = record.searchable_text().to_lowercase();
        self.keywords.iter().any(|keyword| text.contains(keyword))
    }

    /// Keeps relevant records in their original order and stamps them with
    /// [`RELEVANCE_SCORE`].
    pub fn filter(&self, records: Vec<NormalizedRecord>) -> Vec<NormalizedRecord> {
        records
            .into_iter()
            .filter(|record| self.is_relevant(record))
            .map(|record| record.with_relevance_score(RELEVANCE_SCORE))
            .collect()
    }
}
