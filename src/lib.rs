//! Edgar-Ripple: a concurrent company listings scraper
//!
//! This crate walks a paginated directory of company listing pages, discovers
//! every company's detail page, and extracts one record per company. Listing
//! pages and detail pages are fetched concurrently under a bounded worker limit.

pub mod config;
pub mod crawler;
pub mod output;

use thiserror::Error;

/// Main error type for Edgar-Ripple operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("HTML parse error for {target}: {source}")]
    Parse { target: String, source: ParseError },

    #[error("Scrape cancelled")]
    Cancelled,

    #[error("Worker task failed: {0}")]
    Task(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    /// Returns true for network and HTTP status failures
    pub fn is_transport(&self) -> bool {
        matches!(self, ScrapeError::Transport { .. })
    }

    /// Returns true when the page arrived but did not have the expected shape
    pub fn is_parse(&self) -> bool {
        matches!(self, ScrapeError::Parse { .. })
    }
}

/// Document structure errors raised by the page parsers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("missing element: {0}")]
    MissingElement(&'static str),

    #[error("expected {expected} <{element}> elements, found {found}")]
    UnexpectedCount {
        element: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("<{element}> is missing the {attribute} attribute")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("not a number: '{0}'")]
    MalformedNumber(String),

    #[error("listing range '{0}' is not of the form 'X - Y'")]
    MalformedRange(String),

    #[error("link '{href}' does not contain '{marker}'")]
    MissingMarker { href: String, marker: &'static str },

    #[error("row {row} has {found} cells, at least 2 required")]
    TooFewCells { row: usize, found: usize },

    #[error("pagination reports zero listings per page")]
    ZeroPageSize,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Edgar-Ripple operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for the page parsers
pub type ParseResult<T> = std::result::Result<T, ParseError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CompanyIds, CompanyRecord, CompanyStream, EdgarScraper, PageTarget, PaginationInfo};
