//! Configuration types for search execution.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use variant_query::Limits;

/// Configuration for the search executor.
///
/// # Example
///
/// ```rust
/// use variant_query_executor::{CacheConfig, OntologyConfig, SearchConfig};
///
/// let config = SearchConfig::builder()
///     .with_supported_versions(["v1", "v2"])
///     .with_limits(50, 500)
///     .with_ontology(OntologyConfig::default().with_cache(CacheConfig::default()))
///     .build();
/// assert_eq!(config.default_version(), Some("v1"));
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// API versions with a query model; the first one is the default.
    pub supported_versions: Vec<String>,
    /// Page size used when a request has none.
    pub default_limit: u64,
    /// Largest page size a request may ask for.
    pub max_limit: u64,
    /// Ask the index for exact totals on result requests.
    pub track_total_hits: bool,
    /// Disease ontology resolution settings.
    pub ontology: OntologyConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let limits = Limits::default();
        Self {
            supported_versions: vec!["v1".to_string()],
            default_limit: limits.default_limit,
            max_limit: limits.max_limit,
            track_total_hits: true,
            ontology: OntologyConfig::default(),
        }
    }
}

impl SearchConfig {
    /// Creates a new builder for SearchConfig.
    pub fn builder() -> SearchConfigBuilder {
        SearchConfigBuilder {
            config: SearchConfig::default(),
        }
    }

    /// Loads configuration from a JSON file. Missing keys take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Page size limits handed to the query builder.
    pub fn limits(&self) -> Limits {
        Limits {
            default_limit: self.default_limit,
            max_limit: self.max_limit,
        }
    }

    /// Version used when a request names none.
    pub fn default_version(&self) -> Option<&str> {
        self.supported_versions.first().map(String::as_str)
    }

    /// Returns true if `version` has a query model.
    pub fn supports_version(&self, version: &str) -> bool {
        self.supported_versions.iter().any(|v| v == version)
    }
}

/// Builder for SearchConfig.
#[derive(Debug, Clone)]
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    /// Sets the supported API versions; the first becomes the default.
    pub fn with_supported_versions<I, S>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.supported_versions = versions.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the default and maximum page sizes.
    pub fn with_limits(mut self, default_limit: u64, max_limit: u64) -> Self {
        self.config.default_limit = default_limit;
        self.config.max_limit = max_limit;
        self
    }

    /// Enables or disables exact totals on result requests.
    pub fn with_track_total_hits(mut self, track: bool) -> Self {
        self.config.track_total_hits = track;
        self
    }

    /// Sets the ontology settings.
    pub fn with_ontology(mut self, ontology: OntologyConfig) -> Self {
        self.config.ontology = ontology;
        self
    }

    /// Builds the SearchConfig.
    pub fn build(self) -> SearchConfig {
        self.config
    }
}

/// Disease ontology resolution settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OntologyConfig {
    /// Most direct children a node may have. A child lookup returning more
    /// fails instead of truncating the closure.
    pub page_size: usize,
    /// Largest descendant closure accepted (None = unlimited).
    pub max_closure_size: Option<usize>,
    /// Closure cache (None = caching disabled).
    pub cache: Option<CacheConfig>,
}

impl Default for OntologyConfig {
    fn default() -> Self {
        Self {
            page_size: 10_000,
            max_closure_size: None,
            cache: None,
        }
    }
}

impl OntologyConfig {
    /// Enables the closure cache.
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the result-size cap of child lookups.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Limits the size of descendant closures.
    pub fn with_max_closure_size(mut self, max: usize) -> Self {
        self.max_closure_size = Some(max);
        self
    }
}

/// Configuration for the closure cache.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached closures.
    pub max_entries: usize,
    /// Time-to-live for cached closures.
    #[serde(rename = "ttl_secs", deserialize_with = "seconds")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            ttl: Duration::from_secs(300),
        }
    }
}

fn seconds<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_secs)
}

/// Errors raised while loading configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid configuration JSON.
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_search_config_default() {
        let config = SearchConfig::default();
        assert_eq!(config.supported_versions, vec!["v1"]);
        assert_eq!(config.default_limit, 100);
        assert_eq!(config.max_limit, 1_000);
        assert!(config.track_total_hits);
        assert!(config.ontology.cache.is_none());
        assert_eq!(config.ontology.page_size, 10_000);
    }

    #[test]
    fn test_search_config_builder() {
        let config = SearchConfig::builder()
            .with_supported_versions(["v2"])
            .with_limits(10, 20)
            .with_track_total_hits(false)
            .with_ontology(OntologyConfig::default().with_max_closure_size(5))
            .build();

        assert_eq!(config.default_version(), Some("v2"));
        assert!(config.supports_version("v2"));
        assert!(!config.supports_version("v1"));
        assert_eq!(
            config.limits(),
            Limits {
                default_limit: 10,
                max_limit: 20
            }
        );
        assert!(!config.track_total_hits);
        assert_eq!(config.ontology.max_closure_size, Some(5));
    }

    #[test]
    fn test_cache_config_default() {
        let cache = CacheConfig::default();
        assert_eq!(cache.max_entries, 1_000);
        assert_eq!(cache.ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_from_json_file_with_partial_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"max_limit": 250, "ontology": {{"cache": {{"ttl_secs": 60}}}}}}"#
        )
        .unwrap();

        let config = SearchConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.max_limit, 250);
        assert_eq!(config.default_limit, 100);
        let cache = config.ontology.cache.unwrap();
        assert_eq!(cache.ttl, Duration::from_secs(60));
        assert_eq!(cache.max_entries, 1_000);
    }

    #[test]
    fn test_from_json_file_errors() {
        assert!(matches!(
            SearchConfig::from_json_file("/nonexistent/variant-query.json"),
            Err(ConfigError::Io(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            SearchConfig::from_json_file(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
