use crate::core::{Entity, EntityKind};
use crate::domain::model::PageResponse;
use crate::utils::error::{ExportError, Result};
use reqwest::Client;
use std::time::Duration;

/// Walks a PipelineDeals collection endpoint page by page.
#[derive(Debug, Clone)]
pub struct Paginator {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Option<Duration>,
}

impl Paginator {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn collection_url(&self, kind: EntityKind) -> String {
        format!("{}/{}.json", self.base_url.trim_end_matches('/'), kind.path())
    }

    async fn fetch_page(&self, url: &str, page: u64) -> Result<PageResponse> {
        let mut request = self
            .client
            .get(url)
            .query(&[("page", page.to_string()), ("api_key", self.api_key.clone())]);

        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        tracing::debug!("📡 {} page {}: status {}", url, page, response.status());

        if !response.status().is_success() {
            return Err(ExportError::ApiStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.json::<PageResponse>().await?)
    }

    /// Fetches every page of `kind` and returns all entries in page order.
    ///
    /// Page 1 is always requested. Iteration stops once the reported current
    /// page is no longer below the reported page count, which is re-read from
    /// every response.
    pub async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Entity>> {
        let url = self.collection_url(kind);
        let mut entities = Vec::new();
        let mut page = 1;

        loop {
            let body = self.fetch_page(&url, page).await?;
            entities.extend(body.entries.into_iter().map(Entity::from));

            let pagination = body.pagination;
            if pagination.page >= pagination.pages {
                break;
            }
            page += 1;
        }

        tracing::info!("📥 {}: fetched {} records over {} page(s)", kind, entities.len(), page);
        Ok(entities)
    }
}
