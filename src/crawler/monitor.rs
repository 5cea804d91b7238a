//! Periodic progress logging for a running crawl

use crate::crawler::coordinator::CrawlRun;
use crate::crawler::worker::WorkerState;
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Logs worker and frontier status every `interval` until the crawl stops
pub(crate) async fn monitor(run: Arc<CrawlRun>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = run.shutdown.cancelled() => break,
            _ = ticker.tick() => report(&run),
        }
    }

    tracing::debug!("Monitor stopped");
}

fn report(run: &CrawlRun) {
    let frontier = run.frontier.snapshot();
    let stats = run.stats();
    let states = run.board.snapshot();

    tracing::info!(
        "Progress: {} pages visited ({} ok, {} errors), {} queued, {} busy, {} active workers",
        stats.pages_visited,
        stats.success_count,
        stats.error_count,
        frontier.queued,
        frontier.busy,
        run.active_workers.load(Ordering::SeqCst)
    );
    tracing::debug!("Worker states: {}", summarize_states(&states));
}

/// Renders worker states as `state=count` pairs, e.g. `fetching=3 idle=2`
fn summarize_states(states: &[WorkerState]) -> String {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for state in states {
        *counts.entry(state.to_string()).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(state, count)| format!("{}={}", state, count))
        .collect::<Vec<_>>()
        .join(" ")
}
