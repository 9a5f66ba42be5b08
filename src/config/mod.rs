//! Configuration module for Edgar-Ripple
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! A scrape can also run without any file: `Config::default()` is valid.
//!
//! # Example
//!
//! ```no_run
//! use edgar_ripple::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("edgar.toml")).unwrap();
//! println!("Workers: {}", config.scraper.max_concurrent_fetches);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, FailureMode, HttpConfig, PaginationRounding, RetryConfig, RetryStrategy,
    ScraperConfig,
};

// Re-export parser and validation functions
pub use parser::{load_config, parse_config};
pub use validation::{validate, validate_base_url};
