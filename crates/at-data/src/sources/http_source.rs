//! HTTP source for the public artwork API

use async_trait::async_trait;
use at_core::{CatalogSource, FetchError, FieldSet, ListPage, Record, RecordId};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::Deserialize;

use crate::config::CatalogConfig;
use crate::DataError;

/// Pagination block of a list response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub total_pages: usize,
    pub current_page: usize,
}

/// `GET /artworks?page=..` body
#[derive(Debug, Deserialize)]
struct ListResponse {
    data: Vec<Record>,
    #[serde(default)]
    pagination: Pagination,
}

/// `GET /artworks?ids=..` body
#[derive(Debug, Deserialize)]
struct IdsResponse {
    #[serde(default)]
    data: Vec<Record>,
}

/// Catalog source backed by the REST API
pub struct HttpCatalogSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpCatalogSource {
    /// Create a source from configuration
    pub fn new(config: &CatalogConfig) -> Result<Self, DataError> {
        let agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| DataError::InvalidConfig(format!("user_agent: {}", e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, agent.clone());
        headers.insert(HeaderName::from_static("aic-user-agent"), agent);

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/artworks", config.base_url.trim_end_matches('/')),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint: response.url().to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn list_page(
        &self,
        page: usize,
        page_size: usize,
        fields: FieldSet,
    ) -> Result<ListPage, FetchError> {
        let body: ListResponse = self
            .get_json(&[
                ("page", page.to_string()),
                ("limit", page_size.to_string()),
                ("fields", fields.as_csv()),
            ])
            .await?;

        Ok(ListPage {
            records: body.data,
            total_count: body.pagination.total,
        })
    }

    async fn fetch_by_ids(
        &self,
        ids: &[RecordId],
        fields: FieldSet,
    ) -> Result<Vec<Record>, FetchError> {
        let ids = ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",");
        let body: IdsResponse = self
            .get_json(&[("ids", ids), ("fields", fields.as_csv())])
            .await?;
        Ok(body.data)
    }

    fn source_name(&self) -> &str {
        &self.endpoint
    }
}
