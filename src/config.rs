use anyhow::{bail, Result};
use tracing::warn;

pub const SEARCH_URL: &str =
    "https://www.muenster.de/veranstaltungskalender/scripts/frontend/suche.php";
pub const MAPQUEST_URL: &str = "http://open.mapquestapi.com/geocoding/v1/address";

const ENV_MAPQUEST_KEY: &str = "MAPQUEST_KEY";
const ENV_INDEX_PREFIX: &str = "ELASTICSEARCH_URL_PREFIX";
const ENV_START: &str = "MUENSTER_EVENTS_START";
const ENV_END: &str = "MUENSTER_EVENTS_END";

/// Which events the search form asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateMode {
    Today,
    Range { start: String, end: String },
}

impl DateMode {
    pub fn decide(start: Option<String>, end: Option<String>) -> Self {
        match (start, end) {
            (None, _) => DateMode::Today,
            (Some(start), Some(end)) => DateMode::Range { start, end },
            (Some(start), None) => {
                warn!(%start, "end date not given, searching today's events instead");
                DateMode::Today
            }
        }
    }

    /// `(datum_von, datum_bis, zeitraum)` as the search form expects them.
    pub fn form_values(&self) -> (&str, &str, &str) {
        match self {
            DateMode::Today => ("", "", "heute"),
            DateMode::Range { start, end } => (start, end, "zeitraum"),
        }
    }
}

/// Elasticsearch location, split from `ELASTICSEARCH_URL_PREFIX` at its last `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTarget {
    pub base_url: String,
    pub index_prefix: String,
}

impl IndexTarget {
    pub fn parse(url_prefix: &str) -> Option<Self> {
        let (base, prefix) = url_prefix.trim().rsplit_once('/')?;
        if base.is_empty() || !base.contains("://") {
            return None;
        }
        Some(Self {
            base_url: base.trim_end_matches('/').to_string(),
            index_prefix: prefix.to_string(),
        })
    }

    pub fn index_name(&self) -> String {
        format!("{}places", self.index_prefix)
    }
}

/// Values given on the command line; each one wins over its environment variable.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub start: Option<String>,
    pub end: Option<String>,
    pub mapquest_key: Option<String>,
    pub elasticsearch_url_prefix: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub date_mode: DateMode,
    pub mapquest_key: Option<String>,
    pub index: Option<IndexTarget>,
    pub search_url: String,
    pub geocode_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::resolve(Overrides::default())
    }

    pub fn resolve(overrides: Overrides) -> Result<Self> {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    pub fn resolve_with<F>(overrides: Overrides, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick =
            |given: Option<String>, key: &str| non_blank(given).or_else(|| non_blank(env(key)));

        let start = pick(overrides.start, ENV_START);
        let end = pick(overrides.end, ENV_END);
        let mapquest_key = pick(overrides.mapquest_key, ENV_MAPQUEST_KEY);

        let index = match pick(overrides.elasticsearch_url_prefix, ENV_INDEX_PREFIX) {
            Some(raw) => match IndexTarget::parse(&raw) {
                Some(target) => Some(target),
                None => bail!(
                    "{ENV_INDEX_PREFIX} must look like http://host:9200/prefix, got {raw:?}"
                ),
            },
            None => None,
        };

        Ok(Self {
            date_mode: DateMode::decide(start, end),
            mapquest_key,
            index,
            search_url: SEARCH_URL.to_string(),
            geocode_url: MAPQUEST_URL.to_string(),
        })
    }

    pub fn geocoding_enabled(&self) -> bool {
        self.mapquest_key.is_some()
    }

    pub fn publishing_enabled(&self) -> bool {
        self.index.is_some()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
