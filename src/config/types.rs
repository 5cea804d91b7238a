use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Threadwalk
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Only URLs starting with this prefix are followed
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Entry URL; defaults to `base_url`
    #[serde(default)]
    pub seed: Option<String>,

    /// Maximum number of pages fetched per crawl
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: usize,

    /// Number of concurrent workers
    #[serde(rename = "worker-count", default = "default_worker_count")]
    pub worker_count: usize,

    /// How long an idle worker waits for work before re-checking termination (milliseconds)
    #[serde(rename = "dequeue-timeout", default = "default_dequeue_timeout")]
    pub dequeue_timeout: u64,

    /// Lower bound of the randomized pause after a successful fetch (milliseconds)
    #[serde(rename = "min-delay", default = "default_min_delay")]
    pub min_delay: u64,

    /// Upper bound of the randomized pause after a successful fetch (milliseconds)
    #[serde(rename = "max-delay", default = "default_max_delay")]
    pub max_delay: u64,

    /// Interval between worker status reports (milliseconds, 0 disables)
    #[serde(rename = "monitor-interval", default = "default_monitor_interval")]
    pub monitor_interval: u64,
}

/// HTTP fetch and retry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Total request timeout (milliseconds)
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Connection establishment timeout (milliseconds)
    #[serde(rename = "connect-timeout", default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Retries after the first attempt
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff delay (milliseconds); doubles on each retry
    #[serde(rename = "backoff-base", default = "default_backoff_base")]
    pub backoff_base: u64,

    /// Upper bound for backoff delays (milliseconds)
    #[serde(rename = "backoff-cap", default = "default_backoff_cap")]
    pub backoff_cap: u64,

    /// Wait used for a 429 without a Retry-After header (milliseconds)
    #[serde(rename = "default-retry-after", default = "default_retry_after")]
    pub default_retry_after: u64,

    /// Longest Retry-After honored for a 429 (milliseconds)
    #[serde(rename = "max-retry-after", default = "default_max_retry_after")]
    pub max_retry_after: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the JSON results file
    #[serde(rename = "results-path", default = "default_results_path")]
    pub results_path: String,
}

impl CrawlerConfig {
    /// Creates a crawler configuration for `base_url` with default tuning
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            seed: None,
            max_pages: default_max_pages(),
            worker_count: default_worker_count(),
            dequeue_timeout: default_dequeue_timeout(),
            min_delay: default_min_delay(),
            max_delay: default_max_delay(),
            monitor_interval: default_monitor_interval(),
        }
    }

    /// The URL a crawl starts from when none is given explicitly
    pub fn seed_url(&self) -> &str {
        self.seed.as_deref().unwrap_or(&self.base_url)
    }

    pub fn dequeue_timeout(&self) -> Duration {
        Duration::from_millis(self.dequeue_timeout)
    }

    pub fn monitor_interval(&self) -> Option<Duration> {
        (self.monitor_interval > 0).then(|| Duration::from_millis(self.monitor_interval))
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout)
    }
}

impl Config {
    /// Creates a configuration for `base_url` with every other section defaulted
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            crawler: CrawlerConfig::new(base_url),
            fetch: FetchConfig::default(),
            user_agent: UserAgentConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            max_retries: default_max_retries(),
            backoff_base: default_backoff_base(),
            backoff_cap: default_backoff_cap(),
            default_retry_after: default_retry_after(),
            max_retry_after: default_max_retry_after(),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "Threadwalk".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_path: default_results_path(),
        }
    }
}

fn default_max_pages() -> usize {
    100
}

fn default_worker_count() -> usize {
    5
}

fn default_dequeue_timeout() -> u64 {
    1000
}

fn default_min_delay() -> u64 {
    100
}

fn default_max_delay() -> u64 {
    300
}

fn default_monitor_interval() -> u64 {
    5000
}

fn default_timeout() -> u64 {
    10_000
}

fn default_connect_timeout() -> u64 {
    5_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base() -> u64 {
    1_000
}

fn default_backoff_cap() -> u64 {
    30_000
}

fn default_retry_after() -> u64 {
    5_000
}

fn default_max_retry_after() -> u64 {
    60_000
}

fn default_results_path() -> String {
    "data/crawl_results.json".to_string()
}
