//! Console summary of a finished crawl

use crate::crawler::{CrawlSummary, PageResult};
use std::collections::BTreeMap;

/// How many failures to list individually
const MAX_LISTED_ERRORS: usize = 10;

/// Prints the crawl summary to stdout
pub fn print_summary(summary: &CrawlSummary, pages: &[PageResult]) {
    println!("=== Crawl Summary ===\n");

    println!("Overview:");
    println!("  Pages visited: {}", summary.pages_visited);
    println!("  Successful: {}", summary.success_count);
    println!("  Errors: {}", summary.error_count);
    println!("  Duration: {:.2}s", summary.duration_seconds);
    println!("  Stopped: {}", summary.stop_reason);
    println!();

    let by_status = status_breakdown(pages);
    if !by_status.is_empty() {
        println!("Pages by Status:");
        for (status, count) in &by_status {
            let label = if *status == 0 {
                "no response".to_string()
            } else {
                status.to_string()
            };
            println!("  {}: {}", label, count);
        }
        println!();
    }

    let failed: Vec<_> = pages.iter().filter(|page| !page.is_success()).collect();
    if !failed.is_empty() {
        println!("Errors ({}):", failed.len());
        for page in failed.iter().take(MAX_LISTED_ERRORS) {
            println!(
                "  - {}: {}",
                page.url,
                page.error.as_deref().unwrap_or("unknown error")
            );
        }
        if failed.len() > MAX_LISTED_ERRORS {
            println!("  ... and {} more", failed.len() - MAX_LISTED_ERRORS);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages)",
        summary.success_rate(),
        summary.success_count,
        summary.pages_visited
    );
}

/// Counts pages per HTTP status, ordered by status
fn status_breakdown(pages: &[PageResult]) -> BTreeMap<u16, usize> {
    let mut counts = BTreeMap::new();
    for page in pages {
        *counts.entry(page.status_code).or_default() += 1;
    }
    counts
}
