//! Running crawl statistics
//!
//! All counters live behind one lock so `pages_visited` can never be observed
//! out of step with `success_count + error_count`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

/// Snapshot of the crawl counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrawlStats {
    pub pages_visited: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Seconds since start; still running crawls report elapsed time so far
    pub duration_seconds: f64,
}

#[derive(Debug, Default)]
struct StatsState {
    pages_visited: usize,
    success_count: usize,
    error_count: usize,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    started: Option<Instant>,
    finished: Option<Instant>,
}

/// Thread-safe crawl counters
#[derive(Debug, Default)]
pub struct StatsTracker {
    state: Mutex<StatsState>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StatsState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Clears all counters and stamps the start time
    pub fn begin(&self) {
        *self.lock() = StatsState {
            start_time: Some(Utc::now()),
            started: Some(Instant::now()),
            ..StatsState::default()
        };
    }

    /// Records one fetched page and returns the new `pages_visited`
    pub fn record(&self, success: bool) -> usize {
        let mut state = self.lock();
        if success {
            state.success_count += 1;
        } else {
            state.error_count += 1;
        }
        state.pages_visited += 1;
        debug_assert_eq!(
            state.pages_visited,
            state.success_count + state.error_count
        );
        state.pages_visited
    }

    pub fn pages_visited(&self) -> usize {
        self.lock().pages_visited
    }

    /// Stamps the end time; later calls keep the first stamp
    pub fn finish(&self) {
        let mut state = self.lock();
        if state.finished.is_none() {
            state.end_time = Some(Utc::now());
            state.finished = Some(Instant::now());
        }
    }

    pub fn snapshot(&self) -> CrawlStats {
        let state = self.lock();
        let duration_seconds = match (state.started, state.finished) {
            (Some(started), Some(finished)) => finished.duration_since(started).as_secs_f64(),
            (Some(started), None) => started.elapsed().as_secs_f64(),
            _ => 0.0,
        };

        CrawlStats {
            pages_visited: state.pages_visited,
            success_count: state.success_count,
            error_count: state.error_count,
            start_time: state.start_time,
            end_time: state.end_time,
            duration_seconds,
        }
    }
}
