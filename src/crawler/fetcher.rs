//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the scraper, including:
//! - Building the HTTP client with the configured user agent and timeouts
//! - Building listing and company URLs from the base URL
//! - GET requests with the configured retry policy
//! - Error classification (transport vs. document shape)

use crate::config::HttpConfig;
use crate::crawler::retry::{NoRetry, RetryPolicy};
use crate::{Result, ScrapeError};
use reqwest::Client;
use scraper::Html;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// What to fetch: a company detail page or a numbered listing page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageTarget {
    /// Company detail page, addressed by its path segment
    Company(String),

    /// Listing page, addressed by its 1-based page number
    Listing(u32),
}

impl fmt::Display for PageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageTarget::Company(id) => write!(f, "{}", id),
            PageTarget::Listing(page) => write!(f, "listings page {}", page),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The HTTP section of the configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use edgar_ripple::config::HttpConfig;
/// use edgar_ripple::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches listing and company pages relative to one base URL
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    base_url: Url,
    retry: Arc<dyn RetryPolicy>,
}

impl PageFetcher {
    /// Creates a fetcher that never retries
    pub fn new(client: Client, base_url: Url) -> Self {
        Self::with_retry(client, base_url, Arc::new(NoRetry))
    }

    /// Creates a fetcher that consults `retry` after every failed request
    pub fn with_retry(client: Client, base_url: Url, retry: Arc<dyn RetryPolicy>) -> Self {
        Self {
            client,
            base_url,
            retry,
        }
    }

    /// Builds the URL for a target
    ///
    /// Company identifiers are appended to the base URL as written, so a base
    /// URL of `http://host/companies/` yields `http://host/companies/<id>`.
    /// Listing pages keep the base URL and add a `page` query parameter.
    pub fn url_for(&self, target: &PageTarget) -> Result<Url> {
        match target {
            PageTarget::Company(id) => Ok(Url::parse(&format!("{}{}", self.base_url, id))?),
            PageTarget::Listing(page) => {
                let mut url = self.base_url.clone();
                url.query_pairs_mut()
                    .append_pair("page", &page.to_string());
                Ok(url)
            }
        }
    }

    /// Fetches a page body, retrying transport errors as the policy allows
    pub async fn fetch(&self, target: &PageTarget) -> Result<String> {
        let url = self.url_for(target)?;
        tracing::info!("Getting page: {}", target);

        let mut attempt = 0;
        loop {
            match self.get(&url).await {
                Ok(body) => return Ok(body),
                Err(error) => {
                    attempt += 1;
                    let Some(delay) = self.retry.delay_for(attempt, &error) else {
                        return Err(error);
                    };
                    tracing::warn!(
                        "Fetch of {} failed ({}), retry {} in {:?}",
                        target,
                        error,
                        attempt,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Fetches a page and parses it into a document
    pub async fn fetch_document(&self, target: &PageTarget) -> Result<Html> {
        let body = self.fetch(target).await?;
        Ok(Html::parse_document(&body))
    }

    /// Issues a single GET; any non-success status is a transport error
    async fn get(&self, url: &Url) -> Result<String> {
        let transport = |source| ScrapeError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;

        tracing::debug!("{} responded {}", url, response.status());
        response.text().await.map_err(transport)
    }
}
