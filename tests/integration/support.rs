//! In-memory site used to drive the crawler without a network

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use threadwalk::config::Config;
use threadwalk::crawler::{Transport, TransportError, TransportResponse};

pub const BASE: &str = "http://site.test/";

#[derive(Debug, Clone)]
enum Page {
    Html(String),
    Status(u16),
    Panic,
    Exhausted,
}

/// Fake transport serving a fixed set of pages
///
/// Unknown URLs answer 404. Every call is counted per URL, and the highest
/// number of concurrent calls is tracked.
#[derive(Debug, Default)]
pub struct StaticSite {
    pages: HashMap<String, Page>,
    latency: Duration,
    fetches: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StaticSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves an HTML page titled `title` linking to each of `links`
    pub fn page(mut self, url: &str, title: &str, links: &[&str]) -> Self {
        let anchors: String = links
            .iter()
            .map(|href| format!(r#"<a href="{}">{}</a>"#, href, href))
            .collect();
        let html = format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            title, anchors
        );
        self.pages.insert(url.to_string(), Page::Html(html));
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.pages.insert(url.to_string(), Page::Status(status));
        self
    }

    pub fn panics(mut self, url: &str) -> Self {
        self.pages.insert(url.to_string(), Page::Panic);
        self
    }

    pub fn exhausted(mut self, url: &str) -> Self {
        self.pages.insert(url.to_string(), Page::Exhausted);
        self
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn fetch_counts(&self) -> HashMap<String, usize> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight count even when the fetch panics
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for StaticSite {
    async fn fetch(&self, url: &str) -> Result<TransportResponse, TransportError> {
        *self.fetches.lock().unwrap().entry(url.to_string()).or_default() += 1;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match self.pages.get(url) {
            Some(Page::Html(html)) => Ok(TransportResponse::new(200, html.clone())),
            Some(Page::Status(status)) => Ok(TransportResponse::new(*status, "")),
            Some(Page::Panic) => panic!("transport blew up on {}", url),
            Some(Page::Exhausted) => Err(TransportError::Exhausted("no sockets left".into())),
            None => Ok(TransportResponse::new(404, "")),
        }
    }
}

/// Builds a site of `n` pages `/p0 .. /p{n-1}` where each page links to the
/// next three, the root and itself
pub fn chain_site(n: usize) -> StaticSite {
    let mut site = StaticSite::new().page(BASE, "root", &["/p0"]);
    for i in 0..n {
        let links: Vec<String> = (1..=3)
            .map(|step| format!("/p{}", (i + step) % n))
            .chain(["/".to_string(), format!("/p{}", i)])
            .collect();
        let refs: Vec<&str> = links.iter().map(String::as_str).collect();
        site = site.page(&format!("{}p{}", BASE, i), &format!("page {}", i), &refs);
    }
    site
}

/// Fast configuration for tests: no politeness delay, short waits
pub fn test_config(workers: usize) -> Config {
    let mut config = Config::new(BASE);
    config.crawler.worker_count = workers;
    config.crawler.dequeue_timeout = 50;
    config.crawler.min_delay = 0;
    config.crawler.max_delay = 0;
    config.crawler.monitor_interval = 0;
    config.fetch.max_retries = 2;
    config.fetch.backoff_base = 5;
    config.fetch.backoff_cap = 20;
    config.fetch.default_retry_after = 5;
    config.fetch.max_retry_after = 20;
    config
}

pub fn shared(site: StaticSite) -> Arc<StaticSite> {
    Arc::new(site)
}
