//! HTTP transport abstraction
//!
//! The crawler never talks to an HTTP client directly. It goes through the
//! [`Transport`] trait, which performs exactly one GET and reports either the
//! response or a classified transport failure. Retries, backoff and status
//! interpretation live in the fetcher on top of it.
//!
//! [`ReqwestTransport`] is the production implementation: one pooled
//! `reqwest::Client` shared by all workers.

use crate::config::{FetchConfig, UserAgentConfig};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::io;
use std::time::Instant;
use thiserror::Error;

/// A raw HTTP response as seen by the crawler
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,

    /// Response body decoded as text
    pub body: String,

    /// Response headers, names lowercased
    pub headers: HashMap<String, String>,
}

impl TransportResponse {
    /// Creates a response with the given status and body and no headers
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: HashMap::new(),
        }
    }

    /// Adds a header, lowercasing its name
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Looks up a header case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Transport-level failures (no HTTP response was obtained)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Timeout")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    /// No connection could be obtained at all; fatal to the crawl
    #[error("Transport exhausted: {0}")]
    Exhausted(String),

    #[error("Request error: {0}")]
    Other(String),
}

/// Performs a single HTTP GET
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<TransportResponse, TransportError>;
}

/// Formats the user agent header: `Name/Version (+ContactURL)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    match &config.contact_url {
        Some(contact) => format!(
            "{}/{} (+{})",
            config.crawler_name, config.crawler_version, contact
        ),
        None => format!("{}/{}", config.crawler_name, config.crawler_version),
    }
}

/// Builds the pooled HTTP client shared by all workers
///
/// The idle pool per host is sized to the worker count so each worker can
/// keep a warm connection to the crawled host. This caps idle connections
/// only; open connections are bounded by the number of workers, each of
/// which has at most one request in flight.
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    fetch: &FetchConfig,
    pool_size: usize,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(user_agent))
        .timeout(fetch.timeout())
        .connect_timeout(fetch.connect_timeout())
        .pool_max_idle_per_host(pool_size)
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Transport`] backed by a shared reqwest client
///
/// `pool_size` limits how many idle keep-alive connections per host are kept
/// for reuse; reqwest has no cap on total connections. Running out of file
/// descriptors or memory while connecting is reported as
/// [`TransportError::Exhausted`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds the transport; failure here is a startup error
    pub fn new(
        user_agent: &UserAgentConfig,
        fetch: &FetchConfig,
        pool_size: usize,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(user_agent, fetch, pool_size)?,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn fetch(&self, url: &str) -> Result<TransportResponse, TransportError> {
        let started = Instant::now();
        tracing::debug!("HTTP GET {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            let error = classify_error(&e);
            tracing::warn!(
                "HTTP GET {} failed after {:.2}s: {}",
                url,
                started.elapsed().as_secs_f64(),
                error
            );
            error
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let body = response.text().await.map_err(|e| classify_error(&e))?;

        tracing::debug!(
            "HTTP {} from {} ({} bytes in {:.2}s)",
            status,
            url,
            body.len(),
            started.elapsed().as_secs_f64()
        );

        Ok(TransportResponse {
            status,
            body,
            headers,
        })
    }
}

/// Maps a reqwest error onto the transport taxonomy
fn classify_error(error: &reqwest::Error) -> TransportError {
    if is_exhaustion(error) {
        TransportError::Exhausted(error.to_string())
    } else if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}

const ENFILE: i32 = 23;
const EMFILE: i32 = 24;

/// Whether an I/O error anywhere in the source chain means the process ran
/// out of sockets or memory
fn is_exhaustion(error: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(io_error) = err.downcast_ref::<io::Error>() {
            if io_error.kind() == io::ErrorKind::OutOfMemory
                || matches!(io_error.raw_os_error(), Some(ENFILE | EMFILE))
            {
                return true;
            }
        }
        current = err.source();
    }
    false
}
