//! Crawler module for listing and company page scraping
//!
//! This module contains the core scraping logic, including:
//! - HTTP fetching with a pluggable retry policy
//! - HTML parsing of pagination, listing and company pages
//! - Bounded concurrent fan-out
//! - Overall scrape coordination

mod coordinator;
mod fanout;
mod fetcher;
mod parser;
mod retry;

pub use coordinator::{CompanyIds, CompanyStream, EdgarScraper};
pub use fanout::{map_concurrent_ordered, map_concurrent_streaming, ResultStream};
pub use fetcher::{build_http_client, PageFetcher, PageTarget};
pub use parser::{
    company_id_from_href, extract_company_fields, extract_company_ids, parse_company_rows,
    parse_pagination, CompanyRecord, CompanyRow, PaginationInfo, COMPANY_PATH_MARKER,
};
pub use retry::{policy_from_config, ExponentialBackoff, FixedDelay, NoRetry, RetryPolicy};
