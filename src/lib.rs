//! Threadwalk: a concurrent, bounded web crawler
//!
//! This crate crawls the pages reachable from a seed URL with a fixed pool of
//! workers, deduplicating URLs across workers, retrying transient failures with
//! backoff, and stopping deterministically once the page budget is spent or no
//! work remains.

pub mod config;
pub mod crawler;
pub mod output;
pub mod url;

use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid seed URL '{seed}': {reason}")]
    InvalidSeed { seed: String, reason: String },

    #[error("A crawl is already running on this crawler")]
    AlreadyRunning,

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Worker failed: {0}")]
    Worker(String),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to persist results: {0}")]
    Persist(#[from] tempfile::PersistError),
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

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlSummary, Crawler, PageResult};
pub use url::{normalize_url, Scope};
