//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - A deduplicating frontier with termination detection
//! - HTTP fetching with retry and backoff
//! - HTML parsing and in-scope link extraction
//! - The worker pool and overall crawl coordination

mod backoff;
mod coordinator;
mod fetcher;
mod frontier;
mod monitor;
mod parser;
mod stats;
mod store;
mod transport;
mod worker;

pub use backoff::{parse_retry_after, BackoffPolicy, RetryClass};
pub use coordinator::{CrawlSummary, Crawler, StopReason};
pub use fetcher::{FetchResult, Fetcher};
pub use frontier::{Frontier, FrontierSnapshot};
pub use parser::{HtmlLinkExtractor, LinkExtractor, ParsedPage};
pub use stats::{CrawlStats, StatsTracker};
pub use store::{PageResult, PageStore};
pub use transport::{
    build_http_client, user_agent_string, ReqwestTransport, Transport, TransportError,
    TransportResponse,
};
pub use worker::{WorkerBoard, WorkerSettings, WorkerState};
