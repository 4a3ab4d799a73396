use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;

use crate::error::{FetchError, IngestionError};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Source of catalog pages, one request at a time
#[async_trait::async_trait]
pub trait CatalogFetcher: Send + Sync {
    /// Body of the page at `url`, non success statuses are errors
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError>;
}

pub struct HttpCatalogFetcher {
    client: ClientWithMiddleware,
}

impl HttpCatalogFetcher {
    pub fn new() -> Result<Self, IngestionError> {
        let reqwest_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .redirect(Policy::default())
            .build()
            .map_err(|err| IngestionError::HttpClient(err.to_string()))?;
        let client = ClientBuilder::new(reqwest_client)
            .with(TracingMiddleware::default())
            .build();
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl CatalogFetcher for HttpCatalogFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        response
            .text()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))
    }
}
