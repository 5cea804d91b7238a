//! HTTP fetcher implementation
//!
//! This module turns a single logical page fetch into one or more transport
//! calls, including:
//! - Status interpretation (200 is the only success)
//! - Retry of 5xx, 429 and transport failures
//! - Exponential backoff and Retry-After handling
//! - Error classification into page-level failures vs fatal exhaustion

use crate::crawler::backoff::{parse_retry_after, BackoffPolicy, RetryClass};
use crate::crawler::transport::{Transport, TransportError};
use crate::CrawlError;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Result of a fetch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    /// The page answered with HTTP 200
    Success {
        /// HTTP status code (always 200)
        status_code: u16,
        /// Page body content
        body: String,
        /// Transport calls made, including the successful one
        attempts: u32,
    },

    /// The page could not be fetched
    Failed {
        /// Last HTTP status observed, 0 if no response was ever received
        status_code: u16,
        /// Error description
        error: String,
        /// Transport calls made
        attempts: u32,
    },
}

impl FetchResult {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Success { status_code, .. } | Self::Failed { status_code, .. } => *status_code,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. } | Self::Failed { attempts, .. } => *attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Fetches pages through a shared transport with retry and backoff
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 200 | Success |
/// | HTTP 5xx | Retry after backoff (Retry-After overrides, capped) |
/// | HTTP 429 | Retry after Retry-After (or default) regardless of attempt |
/// | Timeout / connection error | Retry after backoff, status 0 |
/// | Transport exhausted | Fatal, returned as `Err` |
/// | Any other status | Immediate failure |
///
/// At most `max_retries + 1` transport calls are made per URL.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    policy: BackoffPolicy,
    max_retries: u32,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, policy: BackoffPolicy, max_retries: u32) -> Self {
        Self {
            transport,
            policy,
            max_retries,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Fetches a URL with full error handling and retry logic
    ///
    /// # Returns
    ///
    /// * `Ok(FetchResult)` - Success or a page-level failure
    /// * `Err(CrawlError::ResourceExhausted)` - The transport cannot serve any request
    pub async fn fetch(&self, url: &str) -> Result<FetchResult, CrawlError> {
        let mut last_status = 0u16;
        let mut last_error = String::new();
        let mut attempts = 0u32;

        for attempt in 0..=self.max_retries {
            attempts = attempt + 1;

            let (class, retry_after) = match self.transport.fetch(url).await {
                Ok(response) => {
                    last_status = response.status;
                    let retry_after = response
                        .header("retry-after")
                        .and_then(|v| parse_retry_after(v, Utc::now()));

                    match response.status {
                        200 => {
                            return Ok(FetchResult::Success {
                                status_code: 200,
                                body: response.body,
                                attempts,
                            });
                        }
                        429 => {
                            last_error = "HTTP Error: 429".to_string();
                            (RetryClass::RateLimited, retry_after)
                        }
                        status @ 500..=599 => {
                            last_error = format!("HTTP Error: {}", status);
                            (RetryClass::ServerError, retry_after)
                        }
                        status => {
                            return Ok(FetchResult::Failed {
                                status_code: status,
                                error: format!("HTTP Error: {}", status),
                                attempts,
                            });
                        }
                    }
                }
                Err(TransportError::Exhausted(reason)) => {
                    tracing::error!("Transport exhausted while fetching {}: {}", url, reason);
                    return Err(CrawlError::ResourceExhausted(reason));
                }
                Err(TransportError::Timeout) => {
                    last_status = 0;
                    last_error = "Timeout".to_string();
                    (RetryClass::Timeout, None)
                }
                Err(e) => {
                    last_status = 0;
                    last_error = e.to_string();
                    (RetryClass::Transport, None)
                }
            };

            if attempt == self.max_retries {
                break;
            }

            let wait = self.policy.delay(attempt, class, retry_after);
            tracing::warn!(
                "{} for {} (attempt {}/{}), retrying in {:?}",
                last_error,
                url,
                attempts,
                self.max_retries + 1,
                wait
            );
            sleep(wait).await;
        }

        Ok(FetchResult::Failed {
            status_code: last_status,
            error: if attempts > 1 {
                format!("{} (after {} attempts)", last_error, attempts)
            } else {
                last_error
            },
            attempts,
        })
    }
}

async fn sleep(wait: Duration) {
    if !wait.is_zero() {
        tokio::time::sleep(wait).await;
    }
}
