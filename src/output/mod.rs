//! Output module for persisting crawl results and reporting summaries
//!
//! This module handles:
//! - Flattening page results into persistable records
//! - Writing records atomically to a JSON file
//! - Printing the end-of-crawl summary

mod report;
mod sink;

pub use report::print_summary;
pub use sink::{JsonFileSink, ResultSink};

use crate::crawler::PageResult;
use serde::{Deserialize, Serialize};

/// One row of the results file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    pub status_code: u16,
    pub error: Option<String>,
    pub links_count: usize,
}

impl From<&PageResult> for PageRecord {
    fn from(page: &PageResult) -> Self {
        Self {
            url: page.url.clone(),
            title: page.title.clone(),
            status_code: page.status_code,
            error: page.error.clone(),
            links_count: page.links.len(),
        }
    }
}

/// Converts page results into records, keeping their order
pub fn to_records(pages: &[PageResult]) -> Vec<PageRecord> {
    pages.iter().map(PageRecord::from).collect()
}
