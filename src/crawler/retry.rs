//! Retry strategies for page fetches
//!
//! The fetcher consults a [`RetryPolicy`] after every failed attempt. The
//! default is [`NoRetry`]: the first transport error is returned to the caller.
//! Parse errors are never retried, since the same document would be served again.

use crate::config::{RetryConfig, RetryStrategy};
use crate::ScrapeError;
use std::sync::Arc;
use std::time::Duration;

/// Decides whether, and after how long, a failed fetch is attempted again
pub trait RetryPolicy: Send + Sync + std::fmt::Debug {
    /// Returns the delay before retry number `attempt` (1-based), or `None` to give up
    fn delay_for(&self, attempt: u32, error: &ScrapeError) -> Option<Duration>;
}

/// Never retries
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn delay_for(&self, _attempt: u32, _error: &ScrapeError) -> Option<Duration> {
        None
    }
}

/// Retries transport errors up to `max_retries` times with a constant delay
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy for FixedDelay {
    fn delay_for(&self, attempt: u32, error: &ScrapeError) -> Option<Duration> {
        if !error.is_transport() || attempt > self.max_retries {
            return None;
        }
        Some(self.delay)
    }
}

/// Retries transport errors with doubling delays capped at `max_delay`
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    pub max_retries: u32,
    pub base: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy for ExponentialBackoff {
    fn delay_for(&self, attempt: u32, error: &ScrapeError) -> Option<Duration> {
        if !error.is_transport() || attempt == 0 || attempt > self.max_retries {
            return None;
        }
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        let delay = self.base.saturating_mul(factor);
        Some(delay.min(self.max_delay))
    }
}

/// Builds the retry policy described by a configuration section
pub fn policy_from_config(config: &RetryConfig) -> Arc<dyn RetryPolicy> {
    match config.strategy {
        RetryStrategy::None => Arc::new(NoRetry),
        RetryStrategy::Fixed => Arc::new(FixedDelay {
            max_retries: config.max_retries,
            delay: Duration::from_millis(config.delay_ms),
        }),
        RetryStrategy::Exponential => Arc::new(ExponentialBackoff {
            max_retries: config.max_retries,
            base: Duration::from_millis(config.delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }),
    }
}
