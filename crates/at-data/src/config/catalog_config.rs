//! Catalog client configuration

use std::path::Path;
use std::time::Duration;
use serde::{Serialize, Deserialize};

use crate::cache::DEFAULT_TTL;
use crate::DataError;

/// Public endpoint of the artwork catalog
pub const DEFAULT_BASE_URL: &str = "https://api.artic.edu/api/v1";

/// Rows per page shown by the table
pub const DEFAULT_PAGE_SIZE: usize = 12;

/// Thresholds and limits of the bulk selection strategies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionTuning {
    /// Largest request served page by page
    pub sequential_max: usize,

    /// Largest request fetched in one concurrent wave
    pub hybrid_max: usize,

    /// Largest request fetched in concurrent batches; anything larger collects ids first
    pub batched_max: usize,

    /// Pages the sequential strategy may fetch after the current one
    pub sequential_page_budget: usize,

    /// Pages in flight per batch
    pub batch_size: usize,
}

impl Default for SelectionTuning {
    fn default() -> Self {
        Self {
            sequential_max: 50,
            hybrid_max: 100,
            batched_max: 500,
            sequential_page_budget: 3,
            batch_size: 10,
        }
    }
}

/// Configuration of the catalog client.
///
/// Every field has a default, so an empty JSON object is a valid file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// API root, without trailing slash
    pub base_url: String,

    /// Records per page, fixed for the session
    pub page_size: usize,

    /// Lifetime of cached responses
    #[serde(with = "super::duration_str")]
    pub cache_ttl: Duration,

    /// Per request timeout enforced by the HTTP client
    #[serde(with = "super::duration_str")]
    pub request_timeout: Duration,

    /// Sent as both `User-Agent` and `AIC-User-Agent`
    pub user_agent: String,

    /// Strategy thresholds
    pub selection: SelectionTuning,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            cache_ttl: DEFAULT_TTL,
            request_timeout: Duration::from_secs(10),
            user_agent: concat!("artable/", env!("CARGO_PKG_VERSION")).to_string(),
            selection: SelectionTuning::default(),
        }
    }
}

impl CatalogConfig {
    /// Load and validate a JSON configuration file
    pub fn load(path: &Path) -> Result<Self, DataError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Parse and validate a JSON configuration document
    pub fn from_json_str(text: &str) -> Result<Self, DataError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the selection engine relies on
    pub fn validate(&self) -> Result<(), DataError> {
        if self.page_size == 0 {
            return Err(DataError::InvalidConfig("page_size must be positive".to_string()));
        }
        if self.selection.batch_size == 0 {
            return Err(DataError::InvalidConfig("selection.batch_size must be positive".to_string()));
        }
        let tuning = &self.selection;
        if !(tuning.sequential_max < tuning.hybrid_max && tuning.hybrid_max < tuning.batched_max) {
            return Err(DataError::InvalidConfig(format!(
                "selection thresholds must be ascending, got {} / {} / {}",
                tuning.sequential_max, tuning.hybrid_max, tuning.batched_max
            )));
        }
        if self.base_url.trim().is_empty() {
            return Err(DataError::InvalidConfig("base_url must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = CatalogConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CatalogConfig::default());
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.selection.batch_size, 10);
    }

    #[test]
    fn test_human_readable_durations() {
        let config = CatalogConfig::from_json_str(
            r#"{"cache_ttl": "90s", "request_timeout": "2m 30s", "page_size": 25}"#,
        )
        .unwrap();
        assert_eq!(config.cache_ttl, Duration::from_secs(90));
        assert_eq!(config.request_timeout, Duration::from_secs(150));
        assert_eq!(config.page_size, 25);

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["cache_ttl"], "1m 30s");
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            CatalogConfig::from_json_str(r#"{"page_size": 0}"#),
            Err(DataError::InvalidConfig(_))
        ));
        assert!(matches!(
            CatalogConfig::from_json_str(r#"{"selection": {"hybrid_max": 40}}"#),
            Err(DataError::InvalidConfig(_))
        ));
        assert!(matches!(
            CatalogConfig::from_json_str(r#"{"cache_ttl": "soon"}"#),
            Err(DataError::Json(_))
        ));
    }
}
