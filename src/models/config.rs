//! Configuration model loaded from external sources.
//!
//! Values are layered with the `config` crate: an optional
//! `config/default.yaml`, an optional file named by `LEGIS_CONFIG`,
//! `LEGIS__*` environment variables (e.g. `LEGIS__COLLECTION__MAX_WORKERS`)
//! and finally the well-known `DATABASE_URL`, `GOOGLE_SEARCH_API_KEY` and
//! `GOOGLE_SEARCH_ENGINE_ID` variables.

use std::env;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::processing::relevance::DEFAULT_KEYWORDS;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
/// Top-level configuration handed to the binary and the orchestrator.
pub struct ServerConfig {
    /// SQLite database path; persistence is disabled when absent.
    pub database_url: Option<String>,
    pub collection: CollectionConfig,
    pub search: SearchConfig,
    pub camara: CamaraConfig,
    pub alesp: AlespConfig,
    pub municipal: MunicipalConfig,
}

impl ServerConfig {
    /// Loads the layered configuration and validates it.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder =
            Config::builder().add_source(File::with_name("config/default").required(false));
        if let Ok(path) = env::var("LEGIS_CONFIG") {
            builder = builder.add_source(File::with_name(&path));
        }
        let settings = builder
            .add_source(
                Environment::with_prefix("LEGIS")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database_url", env::var("DATABASE_URL").ok())?
            .set_override_option("search.api_key", env::var("GOOGLE_SEARCH_API_KEY").ok())?
            .set_override_option(
                "search.engine_id",
                env::var("GOOGLE_SEARCH_ENGINE_ID").ok(),
            )?
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would make every run or request fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.collection.validate()?;
        if self.search.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "search.request_timeout_secs must be at least 1".into(),
            ));
        }
        if self.search.fetch_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "search.fetch_concurrency must be at least 1".into(),
            ));
        }
        if self.camara.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "camara.request_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
/// Knobs of one orchestrator run.
pub struct CollectionConfig {
    pub days_back: u32,
    pub limit_per_source: usize,
    pub include_municipal: bool,
    pub max_workers: usize,
    pub task_timeout_secs: u64,
    pub keywords: Vec<String>,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            days_back: 30,
            limit_per_source: 10,
            include_municipal: true,
            max_workers: 10,
            task_timeout_secs: 120,
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl CollectionConfig {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limit_per_source == 0 {
            return Err(ConfigError::Invalid(
                "collection.limit_per_source must be at least 1".into(),
            ));
        }
        if self.max_workers == 0 {
            return Err(ConfigError::Invalid(
                "collection.max_workers must be at least 1".into(),
            ));
        }
        if self.task_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "collection.task_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
/// Credentials and endpoint of the keyword search API.
pub struct SearchConfig {
    pub api_key: Option<String>,
    pub engine_id: Option<String>,
    pub endpoint: String,
    /// Maximum simultaneous page fetches during content extraction.
    pub fetch_concurrency: usize,
    pub request_timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            engine_id: None,
            endpoint: "https://www.googleapis.com/customsearch/v1".into(),
            fetch_concurrency: 4,
            request_timeout_secs: 10,
        }
    }
}

impl SearchConfig {
    /// Both credentials, when present and non-blank.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let key = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())?;
        let engine = self
            .engine_id
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())?;
        Some((key, engine))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CamaraConfig {
    pub base_url: String,
    /// Value of the `siglaTipo` filter, e.g. `PL`.
    pub bill_type: String,
    pub request_timeout_secs: u64,
}

impl Default for CamaraConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dadosabertos.camara.leg.br/api/v2/".into(),
            bill_type: "PL".into(),
            request_timeout_secs: 15,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AlespConfig {
    /// Assembly site scraped when the news search finds nothing.
    pub base_url: String,
    pub scrape_fallback: bool,
}

impl Default for AlespConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.al.sp.gov.br/".into(),
            scrape_fallback: true,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MunicipalConfig {
    pub region: String,
    pub cities: Vec<String>,
}

impl Default for MunicipalConfig {
    fn default() -> Self {
        Self {
            region: "Vale do Paraíba".into(),
            cities: vec![
                "São José dos Campos".into(),
                "Taubaté".into(),
                "Jacareí".into(),
                "Guaratinguetá".into(),
                "Pindamonhangaba".into(),
            ],
        }
    }
}
