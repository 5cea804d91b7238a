//! Crawl worker loop
//!
//! Each worker repeatedly takes a URL from the frontier, fetches it, offers
//! the links it finds back to the frontier and records the result. Per-URL
//! failures, panics included, become error results for that URL; only
//! transport exhaustion ends the crawl.

use crate::crawler::coordinator::{CrawlRun, StopReason};
use crate::crawler::fetcher::{FetchResult, Fetcher};
use crate::crawler::parser::{LinkExtractor, ParsedPage};
use crate::crawler::store::PageResult;
use crate::CrawlError;
use futures::FutureExt;
use rand::Rng;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Where a worker is in its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WorkerState {
    /// Waiting on the frontier
    Idle = 0,
    /// Fetching a URL
    Fetching = 1,
    /// Parsing a fetched page and enqueueing its links
    Extracting = 2,
    /// Writing the result into stats and the page store
    Recording = 3,
    /// Dequeue came back empty; checking whether the crawl is over
    Draining = 4,
    /// Left the loop
    Stopped = 5,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Fetching,
            2 => Self::Extracting,
            3 => Self::Recording,
            4 => Self::Draining,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::Recording => "recording",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Lock-free table of every worker's current state, read by the monitor
#[derive(Debug)]
pub struct WorkerBoard {
    states: Vec<AtomicU8>,
}

impl WorkerBoard {
    pub fn new(workers: usize) -> Self {
        Self {
            states: (0..workers)
                .map(|_| AtomicU8::new(WorkerState::Idle as u8))
                .collect(),
        }
    }

    pub fn set(&self, worker: usize, state: WorkerState) {
        if let Some(slot) = self.states.get(worker) {
            slot.store(state as u8, Ordering::Relaxed);
        }
    }

    pub fn get(&self, worker: usize) -> Option<WorkerState> {
        self.states
            .get(worker)
            .map(|slot| WorkerState::from_u8(slot.load(Ordering::Relaxed)))
    }

    pub fn snapshot(&self) -> Vec<WorkerState> {
        self.states
            .iter()
            .map(|slot| WorkerState::from_u8(slot.load(Ordering::Relaxed)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Worker loop tuning
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub dequeue_timeout: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

/// Keeps the active-worker counter in step with the worker's lifetime
struct ActiveGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> ActiveGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> (Self, usize) {
        let active = counter.fetch_add(1, Ordering::SeqCst) + 1;
        (Self { counter }, active)
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// One member of the crawl pool
pub(crate) struct Worker {
    id: usize,
    run: Arc<CrawlRun>,
    fetcher: Fetcher,
    extractor: Arc<dyn LinkExtractor>,
    settings: WorkerSettings,
}

impl Worker {
    pub(crate) fn new(
        id: usize,
        run: Arc<CrawlRun>,
        fetcher: Fetcher,
        extractor: Arc<dyn LinkExtractor>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            id,
            run,
            fetcher,
            extractor,
            settings,
        }
    }

    fn set_state(&self, state: WorkerState) {
        tracing::trace!(worker = self.id, "-> {}", state);
        self.run.board.set(self.id, state);
    }

    /// Runs until the crawl's stop signal fires or no work remains
    pub(crate) async fn run(self) {
        let (_active, active) = ActiveGuard::enter(&self.run.active_workers);
        tracing::debug!(worker = self.id, "Worker started (active workers: {})", active);

        loop {
            if self.run.shutdown.is_cancelled() {
                break;
            }

            self.set_state(WorkerState::Idle);
            let next = tokio::select! {
                biased;
                _ = self.run.shutdown.cancelled() => break,
                next = self.run.frontier.dequeue(self.settings.dequeue_timeout) => next,
            };

            let Some(url) = next else {
                self.set_state(WorkerState::Draining);
                if self.run.shutdown.is_cancelled() {
                    break;
                }
                if self.run.frontier.is_finished() {
                    self.run.stop(self.run.termination_reason());
                    break;
                }
                continue;
            };

            let outcome = self.handle(&url).await;
            self.run.frontier.complete();

            match outcome {
                Err(fatal) => {
                    self.run.fail(fatal);
                    break;
                }
                Ok((success, pages_visited)) => {
                    if pages_visited >= self.run.max_pages {
                        self.run.stop(StopReason::MaxPages);
                        break;
                    }
                    if success {
                        self.pause().await;
                    }
                }
            }
        }

        self.set_state(WorkerState::Stopped);
        tracing::debug!(worker = self.id, "Worker stopped");
    }

    /// Fetches, extracts and records one URL
    ///
    /// Returns whether the page succeeded and the new `pages_visited`.
    async fn handle(&self, url: &str) -> Result<(bool, usize), CrawlError> {
        let page = match AssertUnwindSafe(self.process(url)).catch_unwind().await {
            Ok(result) => result?,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(worker = self.id, "Worker panicked on {}: {}", url, message);
                PageResult::failed(url, 0, format!("Worker panicked: {}", message))
            }
        };

        self.set_state(WorkerState::Recording);
        let success = page.is_success();
        tracing::debug!(
            worker = self.id,
            "Processed {} (status: {}, links: {})",
            url,
            page.status_code,
            page.links.len()
        );
        let pages_visited = self.run.record(page);

        Ok((success, pages_visited))
    }

    async fn process(&self, url: &str) -> Result<PageResult, CrawlError> {
        self.set_state(WorkerState::Fetching);

        match self.fetcher.fetch(url).await? {
            FetchResult::Success {
                status_code,
                body,
                attempts,
            } => {
                self.set_state(WorkerState::Extracting);
                let parsed = self.extract(url, &body);

                let new_links = parsed
                    .links
                    .iter()
                    .filter(|link| self.run.frontier.try_enqueue(link))
                    .count();
                tracing::debug!(
                    worker = self.id,
                    "Extracted {} links from {} ({} new)",
                    parsed.links.len(),
                    url,
                    new_links
                );

                Ok(PageResult {
                    url: url.to_string(),
                    title: parsed.title,
                    status_code,
                    error: None,
                    links: parsed.links,
                    visited: false,
                    attempts,
                })
            }
            FetchResult::Failed {
                status_code,
                error,
                attempts,
            } => {
                tracing::warn!(worker = self.id, "Failed to fetch {}: {}", url, error);
                Ok(PageResult {
                    attempts,
                    ..PageResult::failed(url, status_code, error)
                })
            }
        }
    }

    fn extract(&self, url: &str, body: &str) -> ParsedPage {
        match Url::parse(url) {
            Ok(base) => self.extractor.extract(&base, body),
            Err(e) => {
                tracing::warn!(worker = self.id, "Cannot resolve links against {}: {}", url, e);
                ParsedPage::default()
            }
        }
    }

    /// Randomized pause after a successful fetch; cut short by the stop signal
    async fn pause(&self) {
        let min = self.settings.min_delay.as_millis() as u64;
        let max = self.settings.max_delay.as_millis() as u64;
        let millis = rand::thread_rng().gen_range(min..=max.max(min));
        if millis == 0 {
            return;
        }

        tokio::select! {
            _ = self.run.shutdown.cancelled() => {}
            _ = tokio::time::sleep(Duration::from_millis(millis)) => {}
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
