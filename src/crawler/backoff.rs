//! Retry backoff policy
//!
//! Maps an attempt number and a failure class to the time a fetcher waits
//! before trying again. Pure: no clocks or shared state, so every rule can be
//! tested directly.

use crate::config::FetchConfig;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Why the previous attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// HTTP 5xx response
    ServerError,
    /// HTTP 429 response
    RateLimited,
    /// Request timed out
    Timeout,
    /// Connection refused, reset, or other transport failure
    Transport,
}

/// Exponential backoff with a cap and Retry-After handling
///
/// | Condition | Wait |
/// |-----------|------|
/// | 5xx / timeout / transport | `base * 2^attempt`, capped at `cap` |
/// | 5xx with Retry-After | Retry-After, capped at `cap` |
/// | 429 with Retry-After | Retry-After, capped at `max_retry_after` |
/// | 429 without Retry-After | `default_retry_after` |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub default_retry_after: Duration,
    pub max_retry_after: Duration,
}

impl BackoffPolicy {
    /// Builds the policy from fetch configuration
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            base: Duration::from_millis(config.backoff_base),
            cap: Duration::from_millis(config.backoff_cap),
            default_retry_after: Duration::from_millis(config.default_retry_after),
            max_retry_after: Duration::from_millis(config.max_retry_after),
        }
    }

    /// Returns the wait before the retry that follows failed attempt `attempt`
    ///
    /// `attempt` is zero-based: the wait after the first failure is `base`.
    pub fn delay(&self, attempt: u32, class: RetryClass, retry_after: Option<Duration>) -> Duration {
        match class {
            RetryClass::RateLimited => retry_after
                .unwrap_or(self.default_retry_after)
                .min(self.max_retry_after),
            RetryClass::ServerError => match retry_after {
                Some(wait) => wait.min(self.cap),
                None => self.exponential(attempt),
            },
            RetryClass::Timeout | RetryClass::Transport => self.exponential(attempt),
        }
    }

    fn exponential(&self, attempt: u32) -> Duration {
        // 2^31 already overflows any sane cap, so clamp the shift
        let factor = 1u32 << attempt.min(31);
        self.base
            .checked_mul(factor)
            .unwrap_or(self.cap)
            .min(self.cap)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

/// Parses a `Retry-After` header value
///
/// Accepts both forms allowed by RFC 9110: a number of seconds, or an
/// HTTP-date. Dates in the past yield a zero wait.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();

    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let wait = date.with_timezone(&Utc) - now;
    Some(wait.to_std().unwrap_or(Duration::ZERO))
}
