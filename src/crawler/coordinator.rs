//! Scrape coordinator - main scrape orchestration logic
//!
//! This module ties the fetcher, parsers and fan-outs together:
//! - Discovering the page count from page 1
//! - Collecting company identifiers from every listing page, in page order
//! - Streaming company records as their pages complete

use crate::config::{validate, validate_base_url, Config, FailureMode};
use crate::crawler::fanout::{map_concurrent_ordered, map_concurrent_streaming, ResultStream};
use crate::crawler::fetcher::{build_http_client, PageFetcher, PageTarget};
use crate::crawler::parser::{
    extract_company_fields, extract_company_ids, parse_pagination, CompanyRecord, PaginationInfo,
};
use crate::crawler::retry::policy_from_config;
use crate::{ParseResult, Result, ScrapeError};
use scraper::Html;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Company records in completion order
pub type CompanyStream = ResultStream<CompanyRecord>;

/// Company identifiers collected from the listing pages
#[derive(Debug, Default)]
pub struct CompanyIds {
    /// Identifiers in page order
    pub ids: Vec<String>,
    /// Listing pages skipped under [`FailureMode::Continue`], with their errors
    pub skipped_pages: Vec<(u32, ScrapeError)>,
}

/// Scraper for one company listings site
pub struct EdgarScraper {
    config: Arc<Config>,
    fetcher: Arc<PageFetcher>,
    cancel: CancellationToken,
}

impl EdgarScraper {
    /// Creates a scraper for the listings rooted at `base_url`
    ///
    /// # Arguments
    ///
    /// * `base_url` - The listings URL, e.g. `http://host/companies/`
    /// * `config` - The scraper configuration
    ///
    /// # Returns
    ///
    /// * `Ok(EdgarScraper)` - Ready to scrape
    /// * `Err(ScrapeError)` - Invalid URL or configuration, or the HTTP client failed to build
    pub fn new(base_url: &str, config: Config) -> Result<Self> {
        validate(&config)?;
        let base_url = validate_base_url(base_url)?;
        let client = build_http_client(&config.http)?;
        let fetcher = PageFetcher::with_retry(client, base_url, policy_from_config(&config.retry));

        Ok(Self::with_fetcher(fetcher, config))
    }

    /// Creates a scraper around an existing fetcher
    pub fn with_fetcher(fetcher: PageFetcher, config: Config) -> Self {
        Self {
            config: Arc::new(config),
            fetcher: Arc::new(fetcher),
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token that stops every fan-out of this scraper when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn workers(&self) -> usize {
        self.config.scraper.max_concurrent_fetches as usize
    }

    /// Reads the pagination block, always from a fresh fetch of page 1
    pub async fn pagination(&self) -> Result<PaginationInfo> {
        let target = PageTarget::Listing(1);
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ScrapeError::Cancelled),
            info = fetch_and_parse(&self.fetcher, target, parse_pagination) => info,
        }
    }

    /// Number of listing pages on the site
    pub async fn total_pages(&self) -> Result<u32> {
        let info = self.pagination().await?;
        let pages = info.total_pages_with(self.config.scraper.pagination_rounding);
        tracing::info!(
            "{} listings at {} per page: {} listing pages",
            info.total_listings,
            info.listings_per_page,
            pages
        );
        Ok(pages)
    }

    /// Company identifiers on one listing page, in table order
    pub async fn listing_company_ids(&self, page: u32) -> Result<Vec<String>> {
        fetch_and_parse(&self.fetcher, PageTarget::Listing(page), extract_company_ids).await
    }

    /// Company identifiers across all listing pages, flattened in page order
    ///
    /// Page 1 is fetched for pagination before any other listing page is requested.
    /// Under [`FailureMode::Continue`] a failed listing page is recorded in
    /// [`CompanyIds::skipped_pages`] instead of aborting.
    pub async fn all_company_ids(&self) -> Result<CompanyIds> {
        let total_pages = self.total_pages().await?;
        let mode = self.config.scraper.failure_mode;

        let pages = map_concurrent_ordered(1..=total_pages, self.workers(), &self.cancel, |page| {
            async move {
                match self.listing_company_ids(page).await {
                    Ok(ids) => Ok(Ok(ids)),
                    Err(e) if mode == FailureMode::Continue => {
                        tracing::warn!("Skipping listings page {}: {}", page, e);
                        Ok(Err((page, e)))
                    }
                    Err(e) => Err(e),
                }
            }
        })
        .await?;

        let mut collected = CompanyIds::default();
        for page in pages {
            match page {
                Ok(ids) => collected.ids.extend(ids),
                Err(skipped) => collected.skipped_pages.push(skipped),
            }
        }

        tracing::info!(
            "Collected {} company identifiers ({} listing pages skipped)",
            collected.ids.len(),
            collected.skipped_pages.len()
        );
        Ok(collected)
    }

    /// Fetches and parses one company detail page
    pub async fn company_record(&self, company_id: &str) -> Result<CompanyRecord> {
        let target = PageTarget::Company(company_id.to_string());
        fetch_and_parse(&self.fetcher, target, extract_company_fields).await
    }

    /// Streams records for the given companies as their pages complete
    pub fn companies(&self, company_ids: Vec<String>) -> CompanyStream {
        self.stream_companies(company_ids.into_iter().map(Ok).collect())
    }

    /// Streams a record for every company on the site
    ///
    /// Returns once all identifiers are known; records are then pulled from
    /// the stream in completion order. Each skipped listing page comes first
    /// on the stream as its error, so consumers count it as a failure.
    pub async fn all_companies(&self) -> Result<CompanyStream> {
        let CompanyIds { ids, skipped_pages } = self.all_company_ids().await?;

        let items = skipped_pages
            .into_iter()
            .map(|(_, e)| Err(e))
            .chain(ids.into_iter().map(Ok))
            .collect();
        Ok(self.stream_companies(items))
    }

    fn stream_companies(&self, items: Vec<Result<String>>) -> CompanyStream {
        let fetcher = Arc::clone(&self.fetcher);

        map_concurrent_streaming(
            items,
            self.workers(),
            self.config.scraper.failure_mode,
            self.cancel.clone(),
            move |item| {
                let fetcher = Arc::clone(&fetcher);
                async move {
                    let target = PageTarget::Company(item?);
                    fetch_and_parse(&fetcher, target, extract_company_fields).await
                }
            },
        )
    }
}

/// Fetches a page and runs a parser over it, tagging parse failures with the page
async fn fetch_and_parse<T>(
    fetcher: &PageFetcher,
    target: PageTarget,
    parse: fn(&Html) -> ParseResult<T>,
) -> Result<T> {
    let document = fetcher.fetch_document(&target).await?;
    parse(&document).map_err(|source| ScrapeError::Parse {
        target: target.to_string(),
        source,
    })
}
