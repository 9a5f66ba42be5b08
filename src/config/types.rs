//! Configuration types with their defaults

use serde::Deserialize;

/// Main configuration structure for Edgar-Ripple
///
/// Every section and key is optional; a missing key takes its documented default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scraper: ScraperConfig,
    pub http: HttpConfig,
    pub retry: RetryConfig,
}

/// Fan-out behavior configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Maximum number of in-flight page fetches per fan-out
    #[serde(rename = "max-concurrent-fetches")]
    pub max_concurrent_fetches: u32,

    /// How the total page count is derived from the pagination block
    #[serde(rename = "pagination-rounding")]
    pub pagination_rounding: PaginationRounding,

    /// What a fan-out does when one of its pages fails
    #[serde(rename = "failure-mode")]
    pub failure_mode: FailureMode,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 10,
            pagination_rounding: PaginationRounding::default(),
            failure_mode: FailureMode::default(),
        }
    }
}

/// Total page count policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaginationRounding {
    /// `total / per_page`, dropping a trailing partial page
    #[default]
    Truncate,

    /// `ceil(total / per_page)`
    Ceil,
}

/// Per-item failure policy for fan-outs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureMode {
    /// First failure aborts the whole fan-out
    #[default]
    FailFast,

    /// Failures are reported individually and the fan-out keeps going
    Continue,
}

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Whole-request timeout in seconds
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// TCP connect timeout in seconds
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("edgar-ripple/{}", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Retry strategy configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub strategy: RetryStrategy,

    /// Retries after the first attempt
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Fixed delay, or the first delay for exponential backoff (milliseconds)
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,

    /// Upper bound for exponential backoff delays (milliseconds)
    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            strategy: RetryStrategy::None,
            max_retries: 0,
            delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

/// Named retry strategies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetryStrategy {
    #[default]
    None,
    Fixed,
    Exponential,
}
