//! Blocking bridge over an async `reqwest` client.
//!
//! The collaborator traits in `boundary-join-core` are synchronous so the
//! engine stays embeddable anywhere. [`HttpClient`] owns a current-thread
//! Tokio runtime and blocks on it, reusing the caller's runtime via
//! [`tokio::task::block_in_place`] when invoked from a multi-threaded one.

use std::time::Duration;

use log::debug;
use reqwest::Client;
use reqwest::header::HeaderMap;
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use url::Url;

/// Default user agent for outgoing requests.
pub const DEFAULT_USER_AGENT: &str = "boundary-join/0.1";

/// Default number of records requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings shared by the HTTP collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSourceConfig {
    /// Connect and request timeout.
    pub timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Records requested per page by paginated sources.
    pub page_size: usize,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl HttpSourceConfig {
    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the page size used by paginated sources.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

/// Errors raised while constructing an HTTP collaborator.
#[derive(Debug, Error)]
pub enum HttpBuildError {
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    /// The Tokio runtime could not be built.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// A page size of zero would never advance the offset.
    #[error("page size must be greater than zero")]
    ZeroPageSize,
}

/// Errors raised while fetching a remote document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The request timed out.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Requested URL.
        url: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },
    /// The server answered with a non-success status.
    #[error("request to {url} failed with HTTP {status}: {message}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Client error description.
        message: String,
    },
    /// The request failed before a response arrived.
    #[error("request to {url} failed: {message}")]
    Network {
        /// Requested URL.
        url: String,
        /// Client error description.
        message: String,
    },
    /// The response body was not the expected JSON shape.
    #[error("response from {url} is not valid: {message}")]
    Parse {
        /// Requested URL.
        url: String,
        /// Description of the problem.
        message: String,
    },
}

/// Shared blocking HTTP client.
pub(crate) struct HttpClient {
    client: Client,
    timeout: Duration,
    runtime: Runtime,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("client", &self.client)
            .field("timeout", &self.timeout)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish()
    }
}

impl HttpClient {
    pub(crate) fn new(config: &HttpSourceConfig) -> Result<Self, HttpBuildError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(HttpBuildError::Client)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(HttpBuildError::Runtime)?;
        Ok(Self {
            client,
            timeout: config.timeout,
            runtime,
        })
    }

    /// Fetch `url` and return the response body as text.
    pub(crate) fn get_text(&self, url: &Url) -> Result<String, FetchError> {
        let future = self.get_text_async(url);
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }

    async fn get_text_async(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| self.convert_error(&err, url))?
            .error_for_status()
            .map_err(|err| self.convert_error(&err, url))?;
        if let Some(summary) = rate_limit_summary(response.headers()) {
            debug!("Rate limit for {url}: {summary}");
        }
        response
            .text()
            .await
            .map_err(|err| self.convert_error(&err, url))
    }

    fn convert_error(&self, error: &reqwest::Error, url: &Url) -> FetchError {
        if error.is_timeout() {
            return FetchError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout.as_secs(),
            };
        }
        if let Some(status) = error.status() {
            return FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

const RATE_LIMIT_HEADERS: [(&str, &str); 3] = [
    ("x-ratelimit-limit", "limit"),
    ("x-ratelimit-remaining", "remaining"),
    ("x-ratelimit-reset", "reset"),
];

/// Render the rate-limit headers present on a response, if any.
fn rate_limit_summary(headers: &HeaderMap) -> Option<String> {
    let parts: Vec<String> = RATE_LIMIT_HEADERS
        .iter()
        .filter_map(|(header, label)| {
            let value = headers.get(*header)?.to_str().ok()?;
            Some(format!("{label}={value}"))
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join(" "))
}
