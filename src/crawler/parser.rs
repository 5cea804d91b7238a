//! HTML parser for extracting links and metadata
//!
//! This module handles parsing HTML content to extract:
//! - Links to follow (from `<a href>` tags), restricted to the crawl scope
//! - Page title
//!
//! Parsing sits behind the [`LinkExtractor`] trait so the HTML library can be
//! swapped without touching worker logic.

use crate::url::{normalize_in_place, Scope};
use scraper::{Html, Selector};
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// The page title (from the `<title>` tag), empty if absent
    pub title: String,

    /// In-scope absolute links in document order, duplicates kept
    pub links: Vec<String>,
}

/// Turns page content into a title and in-scope absolute links
pub trait LinkExtractor: Send + Sync {
    fn extract(&self, base_url: &Url, content: &str) -> ParsedPage;
}

/// [`LinkExtractor`] backed by a structural HTML5 parse
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document, resolved against the page URL
/// - An empty `href=""`, which resolves to the page itself
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (same page anchors)
/// - Anything outside the crawl scope after normalization
///
/// Malformed markup is recovered by the parser; whatever links survive
/// recovery are returned.
#[derive(Debug, Clone)]
pub struct HtmlLinkExtractor {
    scope: Scope,
}

impl HtmlLinkExtractor {
    pub fn new(scope: Scope) -> Self {
        Self { scope }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

impl LinkExtractor for HtmlLinkExtractor {
    fn extract(&self, base_url: &Url, content: &str) -> ParsedPage {
        let document = Html::parse_document(content);

        let title = extract_title(&document);
        let links = extract_links(&document, base_url)
            .into_iter()
            .filter(|url| self.scope.contains(url))
            .map(String::from)
            .collect();

        ParsedPage { title, links }
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> String {
    let Ok(title_selector) = Selector::parse("title") else {
        return String::new();
    };

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Extracts all followable links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

/// Resolves a link href to a normalized absolute URL
///
/// An empty href resolves to the base URL. Returns None if the link should
/// be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    normalize_in_place(&mut absolute_url).ok()?;
    Some(absolute_url)
}
