use crate::url::normalize::normalize_url;
use crate::UrlResult;
use url::Url;

/// Restricts a crawl to URLs under a base prefix
///
/// A URL is in scope when its normalized form starts with the normalized
/// prefix at a path boundary:
///
/// - `http://example.com/docs` contains `http://example.com/docs/intro`
///   and `http://example.com/docs?page=2`
/// - it does not contain `http://example.com/docsets`
/// - a bare origin such as `http://example.com` contains every path on that
///   host, but not `http://example.com.evil.org/`
///
/// # Examples
///
/// ```
/// use threadwalk::url::Scope;
///
/// let scope = Scope::new("http://example.com/docs").unwrap();
/// assert!(scope.contains_str("http://example.com/docs/intro"));
/// assert!(!scope.contains_str("http://example.com/docsets"));
/// assert!(!scope.contains_str("http://other.com/docs"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    prefix: String,
}

impl Scope {
    /// Builds a scope from a base URL, normalizing it first
    pub fn new(base_url: &str) -> UrlResult<Self> {
        let prefix = normalize_url(base_url)?.to_string();
        Ok(Self { prefix })
    }

    /// The normalized prefix all in-scope URLs start with
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns true if the (already normalized) URL lies under the prefix
    pub fn contains(&self, url: &Url) -> bool {
        match url.as_str().strip_prefix(self.prefix.as_str()) {
            None => false,
            Some(rest) => {
                self.prefix.ends_with('/')
                    || rest.is_empty()
                    || rest.starts_with(['/', '?', '#'])
            }
        }
    }

    /// Normalizes `url` and checks whether it is in scope
    pub fn contains_str(&self, url: &str) -> bool {
        normalize_url(url).map_or(false, |u| self.contains(&u))
    }
}
