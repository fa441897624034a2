use crate::config::{FeedConfig, FeedEndpoint};
use crate::error::{AppError, AppResult};
use crate::models::ScrapedProduct;
use anyhow::Context;
use async_trait::async_trait;

/// Supplies scraped product records, one batch per run.
///
/// The scraping layer itself (selectors, sessions, retries) lives behind
/// this boundary; the backend only sees the record shape it hands over.
#[async_trait]
pub trait ProductFeed: Send + Sync {
    /// Which site this feed covers
    fn source(&self) -> &str;

    /// Fetch one batch of scraped records
    async fn fetch(&self) -> anyhow::Result<Vec<ScrapedProduct>>;
}

/// Feed that pulls JSON batches from a scraper service endpoint
pub struct HttpFeed {
    source: String,
    url: String,
    client: reqwest::Client,
}

impl HttpFeed {
    /// Create a feed for one endpoint, reusing a shared client
    pub fn new(endpoint: &FeedEndpoint, client: reqwest::Client) -> Self {
        Self {
            source: endpoint.source.clone(),
            url: endpoint.url.clone(),
            client,
        }
    }

    /// Build one feed per configured endpoint
    pub fn from_config(config: &FeedConfig) -> AppResult<Vec<HttpFeed>> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build feed client: {}", e)))?;

        Ok(config
            .endpoints
            .iter()
            .map(|endpoint| HttpFeed::new(endpoint, client.clone()))
            .collect())
    }
}

#[async_trait]
impl ProductFeed for HttpFeed {
    fn source(&self) -> &str {
        &self.source
    }

    async fn fetch(&self) -> anyhow::Result<Vec<ScrapedProduct>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("feed request to {} failed", self.url))?
            .error_for_status()
            .with_context(|| format!("feed {} returned an error status", self.source))?;

        let items = response
            .json::<Vec<ScrapedProduct>>()
            .await
            .with_context(|| format!("feed {} returned malformed records", self.source))?;

        Ok(items)
    }
}
