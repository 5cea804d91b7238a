//! Deduplicating work queue shared by all workers
//!
//! The frontier is the only place URLs enter the crawl. Besides the queue it
//! tracks which URLs were handed out (`visited`), how many workers are
//! currently processing a URL (`busy`) and how many pages the crawl may still
//! start (the page budget). Keeping all of it under one lock is what makes
//! "nothing queued and nobody busy" a single atomic decision: a busy worker
//! enqueues the links it found before it reports completion, so the queue can
//! only look empty with zero busy workers when the crawl is really over.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct FrontierState {
    /// URLs waiting to be fetched, in discovery order
    queue: VecDeque<String>,

    /// Membership index for `queue`
    queued: HashSet<String>,

    /// URLs whose fetch has started or completed
    visited: HashSet<String>,

    /// Workers that dequeued a URL and have not called `complete` yet
    busy: usize,

    /// Set once the crawl has been stopped; dequeue returns immediately
    closed: bool,
}

impl FrontierState {
    fn budget_spent(&self, max_pages: usize) -> bool {
        self.visited.len() >= max_pages
    }

    fn finished(&self, max_pages: usize) -> bool {
        self.busy == 0 && (self.queue.is_empty() || self.budget_spent(max_pages))
    }
}

/// Point-in-time view of the frontier, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontierSnapshot {
    pub queued: usize,
    pub visited: usize,
    pub busy: usize,
}

/// Thread-safe, deduplicating URL queue with built-in termination detection
#[derive(Debug)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    notify: Notify,
    max_pages: usize,
}

impl Frontier {
    /// Creates an empty frontier that will hand out at most `max_pages` URLs
    pub fn new(max_pages: usize) -> Self {
        Self {
            state: Mutex::new(FrontierState::default()),
            notify: Notify::new(),
            max_pages,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        // Every critical section leaves the state consistent, so a panic in
        // another holder does not invalidate it
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds `url` unless it was already queued or visited
    ///
    /// This is the sole dedup gate of the crawl. Returns whether the URL was
    /// added.
    pub fn try_enqueue(&self, url: &str) -> bool {
        let added = {
            let mut state = self.lock();
            if state.closed || state.visited.contains(url) || state.queued.contains(url) {
                false
            } else {
                state.queued.insert(url.to_string());
                state.queue.push_back(url.to_string());
                true
            }
        };

        if added {
            tracing::trace!("Queued {}", url);
            self.notify.notify_one();
        }
        added
    }

    /// Waits up to `timeout` for a URL
    ///
    /// On success the URL moves from `queued` to `visited` and the caller is
    /// counted as busy until it calls [`Frontier::complete`]. Returns `None`
    /// on timeout, when the page budget is spent, when the crawl is finished,
    /// or when the frontier was closed.
    pub async fn dequeue(&self, timeout: Duration) -> Option<String> {
        let deadline = Instant::now() + timeout;

        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before inspecting the state so a wakeup between the
            // check and the await is not lost
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.closed || state.finished(self.max_pages) {
                    return None;
                }

                if !state.budget_spent(self.max_pages) {
                    if let Some(url) = state.queue.pop_front() {
                        state.queued.remove(&url);
                        let first_visit = state.visited.insert(url.clone());
                        debug_assert!(first_visit, "URL dequeued twice: {}", url);
                        state.busy += 1;
                        return Some(url);
                    }
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return None;
            }
        }
    }

    /// Marks the calling worker as done with the URL it dequeued
    ///
    /// Must be called exactly once per successful dequeue, after every link
    /// found on the page has been offered to [`Frontier::try_enqueue`].
    pub fn complete(&self) {
        let finished = {
            let mut state = self.lock();
            debug_assert!(state.busy > 0, "complete() without a matching dequeue");
            state.busy = state.busy.saturating_sub(1);
            state.finished(self.max_pages)
        };

        if finished {
            self.notify.notify_waiters();
        }
    }

    /// Stops handing out work and wakes every waiting worker
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
    }

    /// True when no worker is busy and there is nothing left to hand out
    ///
    /// This is the authoritative termination check: both conditions are read
    /// under the same lock.
    pub fn is_finished(&self) -> bool {
        self.lock().finished(self.max_pages)
    }

    /// Best-effort hint that the queue is empty; never a termination decision
    pub fn approx_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of URLs handed out so far
    pub fn visited_count(&self) -> usize {
        self.lock().visited.len()
    }

    pub fn snapshot(&self) -> FrontierSnapshot {
        let state = self.lock();
        FrontierSnapshot {
            queued: state.queue.len(),
            visited: state.visited.len(),
            busy: state.busy,
        }
    }
}
