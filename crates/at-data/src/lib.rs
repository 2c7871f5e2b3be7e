//! Data access for the artwork table: gateway, cache, sources and configuration

pub mod cache;
pub mod config;
pub mod gateway;
pub mod schema;
pub mod sources;

use arrow::error::ArrowError;
use thiserror::Error;

// Re-exports
pub use cache::{CacheStats, Clock, ManualClock, PageCache, RequestSignature, SystemClock};
pub use config::{CatalogConfig, SelectionTuning};
pub use gateway::CatalogGateway;
pub use schema::{record_schema, records_to_batch};
pub use sources::{HttpCatalogSource, MemoryCatalog};

/// Errors that can occur while setting up or converting catalog data
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Arrow error: {0}")]
    Arrow(ArrowError),
}

impl From<ArrowError> for DataError {
    fn from(error: ArrowError) -> Self {
        DataError::Arrow(error)
    }
}

/// Build a gateway over the HTTP source from configuration
pub fn http_gateway(config: &CatalogConfig) -> Result<CatalogGateway, DataError> {
    let source = HttpCatalogSource::new(config)?;
    Ok(CatalogGateway::new(
        std::sync::Arc::new(source),
        PageCache::new(config.cache_ttl),
    ))
}
