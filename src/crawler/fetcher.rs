//! HTTP fetcher implementation
//!
//! The pipeline only depends on the [`Fetch`] trait: given a URL, a timeout
//! and a user-agent string it returns the status code, the effective URL
//! after redirects, and the body. [`HttpFetcher`] is the production
//! implementation built on a blocking `reqwest` client.

use crate::{Result, TidemarkError};
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::redirect::Policy;
use std::time::Duration;
use tracing::trace;

/// Redirect hops followed before giving up
pub const MAX_REDIRECTS: usize = 5;

/// What a fetch returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: u16,
    /// Final URL after redirects
    pub effective_url: String,
    /// Response body; empty for non-text content
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network fetch collaborator
///
/// Implementations must be shareable between worker threads. Retry and
/// redirect behaviour is their own business; `effective_url` must name the
/// URL the body actually came from.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str, timeout: Duration, user_agent: &str) -> Result<FetchResponse>;
}

/// Builds the blocking HTTP client shared by all fetch workers
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client() -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Fetch`] over HTTP(S)
///
/// Only `text/*` responses keep their body; anything else (images, PDFs,
/// archives) comes back with an empty body so it costs nothing downstream.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
        })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str, timeout: Duration, user_agent: &str) -> Result<FetchResponse> {
        let http_error = |source: reqwest::Error| TidemarkError::Http {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .header(USER_AGENT, user_agent)
            .send()
            .map_err(http_error)?;

        let status = response.status().as_u16();
        let effective_url = response.url().to_string();
        let is_text = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with("text"))
            .unwrap_or(false);

        let body = if is_text {
            response.bytes().map_err(http_error)?.to_vec()
        } else {
            Vec::new()
        };

        trace!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok(FetchResponse {
            status,
            effective_url,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client().is_ok());
    }

    #[test]
    fn test_http_fetcher_new() {
        assert!(HttpFetcher::new().is_ok());
    }

    #[test]
    fn test_response_success_range() {
        let mut response = FetchResponse {
            status: 200,
            effective_url: "http://h/".to_string(),
            body: Vec::new(),
        };
        assert!(response.is_success());
        response.status = 299;
        assert!(response.is_success());
        response.status = 301;
        assert!(!response.is_success());
        response.status = 0;
        assert!(!response.is_success());
    }

    #[test]
    fn test_unreachable_host_is_error() {
        let fetcher = HttpFetcher::new().unwrap();
        // port 9 (discard) on localhost is closed in test environments
        let result = fetcher.fetch(
            "http://127.0.0.1:9/",
            Duration::from_secs(2),
            "tidemark-test/1.0",
        );
        assert!(matches!(result, Err(TidemarkError::Http { .. })));
    }
}
