//! Page store: completed fetch results keyed by URL

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Outcome of fetching one page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageResult {
    /// Canonical absolute URL
    pub url: String,

    /// Page title, empty if unavailable
    pub title: String,

    /// HTTP status; 0 means no response was received
    pub status_code: u16,

    /// Error description for failed pages
    pub error: Option<String>,

    /// In-scope absolute links found on the page, in document order
    pub links: Vec<String>,

    /// Set once the result is stored
    pub visited: bool,

    /// Transport calls made for this page
    pub attempts: u32,
}

impl PageResult {
    /// Creates an error result for a page that produced no usable response
    pub fn failed(url: impl Into<String>, status_code: u16, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status_code,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.status_code == 200
    }
}

/// Thread-safe map from URL to [`PageResult`]
///
/// The frontier guarantees a single writer per URL; a second insert for the
/// same key is a defect and trips a debug assertion.
#[derive(Debug, Default)]
pub struct PageStore {
    pages: Mutex<BTreeMap<String, PageResult>>,
}

impl PageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, PageResult>> {
        self.pages.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stores a result, marking it visited
    pub fn insert(&self, mut page: PageResult) {
        page.visited = true;
        let url = page.url.clone();
        let previous = self.lock().insert(url.clone(), page);
        debug_assert!(previous.is_none(), "page stored twice: {}", url);
    }

    pub fn get(&self, url: &str) -> Option<PageResult> {
        self.lock().get(url).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copies all results out, ordered by URL
    pub fn snapshot(&self) -> Vec<PageResult> {
        self.lock().values().cloned().collect()
    }
}
