//! Crawler coordinator - crawl orchestration
//!
//! This module owns everything that lives for exactly one crawl:
//! - The frontier, stats and page store
//! - The stop signal and the reason it fired
//! - The worker pool and the progress monitor
//!
//! A [`Crawler`] can run many crawls one after the other; each call to
//! [`Crawler::start`] builds a fresh [`CrawlRun`].

use crate::config::{validate, Config};
use crate::crawler::backoff::BackoffPolicy;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::frontier::Frontier;
use crate::crawler::monitor::monitor;
use crate::crawler::parser::{HtmlLinkExtractor, LinkExtractor};
use crate::crawler::stats::{CrawlStats, StatsTracker};
use crate::crawler::store::{PageResult, PageStore};
use crate::crawler::transport::{ReqwestTransport, Transport};
use crate::crawler::worker::{Worker, WorkerBoard, WorkerSettings};
use crate::url::{normalize_url, Scope};
use crate::{CrawlError, Result};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Why a crawl stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// No queued URLs and no worker busy
    Exhausted,
    /// The page budget was spent
    MaxPages,
    /// Stopped from outside via [`Crawler::cancel`]
    Cancelled,
    /// A worker hit an unrecoverable error
    Fatal,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Exhausted => "no more pages to crawl",
            Self::MaxPages => "page limit reached",
            Self::Cancelled => "cancelled",
            Self::Fatal => "fatal error",
        };
        f.write_str(text)
    }
}

/// Final figures of a finished crawl
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlSummary {
    pub pages_visited: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub duration_seconds: f64,
    pub stop_reason: StopReason,
}

impl CrawlSummary {
    fn new(stats: &CrawlStats, stop_reason: StopReason) -> Self {
        Self {
            pages_visited: stats.pages_visited,
            success_count: stats.success_count,
            error_count: stats.error_count,
            duration_seconds: stats.duration_seconds,
            stop_reason,
        }
    }

    /// Share of visited pages that succeeded, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.pages_visited == 0 {
            return 0.0;
        }
        (self.success_count as f64 / self.pages_visited as f64) * 100.0
    }

    /// Share of visited pages that failed, as a percentage
    pub fn error_rate(&self) -> f64 {
        if self.pages_visited == 0 {
            return 0.0;
        }
        (self.error_count as f64 / self.pages_visited as f64) * 100.0
    }
}

/// State shared by the workers and monitor of one crawl
#[derive(Debug)]
pub(crate) struct CrawlRun {
    pub(crate) frontier: Frontier,
    pub(crate) stats: StatsTracker,
    pub(crate) store: PageStore,
    pub(crate) shutdown: CancellationToken,
    pub(crate) board: WorkerBoard,
    pub(crate) active_workers: AtomicUsize,
    pub(crate) max_pages: usize,
    /// Held while a page lands in both the store and the stats
    recording: Mutex<()>,
    stop_reason: Mutex<Option<StopReason>>,
    fatal: Mutex<Option<CrawlError>>,
}

impl CrawlRun {
    pub(crate) fn new(max_pages: usize, workers: usize) -> Self {
        Self {
            frontier: Frontier::new(max_pages),
            stats: StatsTracker::new(),
            store: PageStore::new(),
            shutdown: CancellationToken::new(),
            board: WorkerBoard::new(workers),
            active_workers: AtomicUsize::new(0),
            max_pages,
            recording: Mutex::new(()),
            stop_reason: Mutex::new(None),
            fatal: Mutex::new(None),
        }
    }

    fn reason_slot(&self) -> MutexGuard<'_, Option<StopReason>> {
        self.stop_reason
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn recording(&self) -> MutexGuard<'_, ()> {
        self.recording
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stores a page result and counts it in one step
    ///
    /// Returns the number of pages visited including this one.
    pub(crate) fn record(&self, page: PageResult) -> usize {
        let success = page.is_success();
        let _recording = self.recording();
        self.store.insert(page);
        self.stats.record(success)
    }

    /// Results recorded so far, consistent with [`CrawlRun::stats`]
    pub(crate) fn results(&self) -> Vec<PageResult> {
        let _recording = self.recording();
        self.store.snapshot()
    }

    pub(crate) fn stats(&self) -> CrawlStats {
        let _recording = self.recording();
        self.stats.snapshot()
    }

    fn fatal_slot(&self) -> MutexGuard<'_, Option<CrawlError>> {
        self.fatal.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Raises the stop signal
    ///
    /// Only the first call records its reason and logs; the rest are no-ops.
    pub(crate) fn stop(&self, reason: StopReason) {
        {
            let mut slot = self.reason_slot();
            if slot.is_some() {
                return;
            }
            *slot = Some(reason);
        }

        tracing::info!(
            "Stopping crawl: {} ({} pages visited)",
            reason,
            self.stats.pages_visited()
        );
        self.frontier.close();
        self.shutdown.cancel();
    }

    /// Stores an unrecoverable error and stops the crawl
    pub(crate) fn fail(&self, error: CrawlError) {
        tracing::error!("Fatal crawl error: {}", error);
        {
            let mut slot = self.fatal_slot();
            if slot.is_none() {
                *slot = Some(error);
            }
        }
        self.stop(StopReason::Fatal);
    }

    /// Reason to report when the frontier runs dry
    pub(crate) fn termination_reason(&self) -> StopReason {
        if self.stats.pages_visited() >= self.max_pages {
            StopReason::MaxPages
        } else {
            StopReason::Exhausted
        }
    }

    pub(crate) fn stop_reason(&self) -> Option<StopReason> {
        *self.reason_slot()
    }

    fn take_fatal(&self) -> Option<CrawlError> {
        self.fatal_slot().take()
    }
}

/// Clears the running flag when a crawl ends, however it ends
struct RunningGuard<'a> {
    running: &'a AtomicBool,
}

impl<'a> RunningGuard<'a> {
    fn acquire(running: &'a AtomicBool) -> Result<Self> {
        running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| CrawlError::AlreadyRunning)?;
        Ok(Self { running })
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Bounded, multi-worker web crawler
///
/// ```no_run
/// use threadwalk::{Config, Crawler};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let crawler = Crawler::new(Config::new("https://example.com/"))?;
/// let summary = crawler.start("https://example.com/", 50).await?;
/// println!("visited {} pages", summary.pages_visited);
/// # Ok(())
/// # }
/// ```
pub struct Crawler {
    config: Arc<Config>,
    scope: Scope,
    fetcher: Fetcher,
    extractor: Arc<dyn LinkExtractor>,
    running: AtomicBool,
    current: Mutex<Option<Arc<CrawlRun>>>,
}

impl Crawler {
    /// Creates a crawler that fetches over HTTP
    ///
    /// Failure to build the HTTP client is reported as resource exhaustion.
    pub fn new(config: Config) -> Result<Self> {
        validate(&config)?;
        let transport = ReqwestTransport::new(
            &config.user_agent,
            &config.fetch,
            config.crawler.worker_count,
        )
        .map_err(|e| CrawlError::ResourceExhausted(format!("failed to build HTTP client: {}", e)))?;

        Self::with_transport(config, Arc::new(transport))
    }

    /// Creates a crawler on top of an injected transport
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        validate(&config)?;
        let scope = Scope::new(&config.crawler.base_url)?;
        let fetcher = Fetcher::new(
            transport,
            BackoffPolicy::from_config(&config.fetch),
            config.fetch.max_retries,
        );

        Ok(Self {
            config: Arc::new(config),
            scope: scope.clone(),
            fetcher,
            extractor: Arc::new(HtmlLinkExtractor::new(scope)),
            running: AtomicBool::new(false),
            current: Mutex::new(None),
        })
    }

    /// Replaces the HTML link extractor
    pub fn with_extractor(mut self, extractor: Arc<dyn LinkExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn current(&self) -> MutexGuard<'_, Option<Arc<CrawlRun>>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Crawls from the configured seed with the configured page budget
    pub async fn run(&self) -> Result<CrawlSummary> {
        let seed = self.config.crawler.seed_url().to_string();
        self.start(&seed, self.config.crawler.max_pages).await
    }

    /// Crawls everything reachable from `seed`, visiting at most `max_pages`
    ///
    /// Returns once every worker has exited. Per-page failures are part of
    /// the results; only bad input, a concurrent call or a fatal resource
    /// error produce `Err`.
    pub async fn start(&self, seed: &str, max_pages: usize) -> Result<CrawlSummary> {
        let _running = RunningGuard::acquire(&self.running)?;

        let seed_url = normalize_url(seed).map_err(|e| CrawlError::InvalidSeed {
            seed: seed.to_string(),
            reason: e.to_string(),
        })?;

        let worker_count = self.config.crawler.worker_count;
        let run = Arc::new(CrawlRun::new(max_pages, worker_count));
        *self.current() = Some(run.clone());

        run.stats.begin();
        tracing::info!(
            "Starting crawl of {} with {} workers (max pages: {})",
            seed_url,
            worker_count,
            max_pages
        );

        if !self.scope.contains(&seed_url) {
            tracing::warn!("Seed {} is outside {}", seed_url, self.scope.prefix());
        }
        run.frontier.try_enqueue(seed_url.as_str());

        let settings = WorkerSettings {
            dequeue_timeout: self.config.crawler.dequeue_timeout(),
            min_delay: Duration::from_millis(self.config.crawler.min_delay),
            max_delay: Duration::from_millis(self.config.crawler.max_delay),
        };

        // Dropping either set aborts its tasks, so an abandoned `start`
        // future does not leave workers behind.
        let mut monitors = JoinSet::new();
        if let Some(interval) = self.config.crawler.monitor_interval() {
            monitors.spawn(monitor(run.clone(), interval));
        }

        let mut workers = JoinSet::new();
        for id in 0..worker_count {
            let worker = Worker::new(
                id,
                run.clone(),
                self.fetcher.clone(),
                self.extractor.clone(),
                settings,
            );
            workers.spawn(worker.run());
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                run.fail(CrawlError::Worker(e.to_string()));
            }
        }

        // Workers only exit after a stop, but make sure the monitor sees one
        run.stop(run.termination_reason());
        while monitors.join_next().await.is_some() {}

        run.stats.finish();
        debug_assert_eq!(run.active_workers.load(Ordering::SeqCst), 0);

        if let Some(error) = run.take_fatal() {
            return Err(error);
        }

        let stats = run.stats();
        let stop_reason = run.stop_reason().unwrap_or(StopReason::Exhausted);
        tracing::info!(
            "Crawl completed: {} pages ({} ok, {} errors) in {:.2}s, {}",
            stats.pages_visited,
            stats.success_count,
            stats.error_count,
            stats.duration_seconds,
            stop_reason
        );

        Ok(CrawlSummary::new(&stats, stop_reason))
    }

    /// Stops the in-flight crawl
    ///
    /// Fetches already under way finish and are recorded; no new URL is
    /// dequeued. Does nothing when no crawl is running.
    pub fn cancel(&self) {
        if !self.is_running() {
            return;
        }
        if let Some(run) = self.current().as_ref() {
            run.stop(StopReason::Cancelled);
        }
    }

    /// Results of the current or most recent crawl, ordered by URL
    pub fn results(&self) -> Vec<PageResult> {
        self.current()
            .as_ref()
            .map(|run| run.results())
            .unwrap_or_default()
    }

    /// Live statistics of the current or most recent crawl
    pub fn stats(&self) -> CrawlStats {
        self.current()
            .as_ref()
            .map(|run| run.stats())
            .unwrap_or_default()
    }
}
