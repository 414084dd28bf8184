//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - A global cap on in-flight requests
//! - Per-host politeness delays (configured delay or robots.txt crawl-delay)
//! - robots.txt checks before any page request
//! - Retry with exponential backoff for transient failures
//! - Error classification

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::robots::{ParsedRobots, RobotsCache};
use crate::state::HostState;
use crate::url::extract_domain;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Semaphore;
use url::Url;

/// Upper bound applied to a robots.txt crawl-delay
const MAX_CRAWL_DELAY: Duration = Duration::from_secs(60);

/// Maximum redirect hops followed for one request
const MAX_REDIRECTS: usize = 10;

/// A successfully fetched response
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after following redirects
    pub final_url: Url,
    pub status_code: u16,
    /// Content-Type header value (empty if absent)
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Result of a fetch that did not fail
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Fetched(FetchedPage),
    /// robots.txt disallows the URL; no request was made
    RobotsDisallowed,
}

/// A failed fetch: network error, timeout, or non-2xx response
#[derive(Debug, Clone, Error)]
#[error("fetch of {url} failed: {cause}")]
pub struct FetchError {
    pub url: String,
    pub status_code: Option<u16>,
    /// Whether trying again later might succeed
    pub retryable: bool,
    pub cause: String,
}

impl FetchError {
    /// Classifies a non-2xx HTTP status
    ///
    /// 5xx and 429 are retryable; every other status is final.
    pub fn from_status(url: &Url, status: StatusCode) -> Self {
        Self {
            url: url.to_string(),
            status_code: Some(status.as_u16()),
            retryable: status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS,
            cause: format!("HTTP {}", status),
        }
    }

    /// Classifies a transport-level error
    ///
    /// Timeouts and connection failures are retryable; redirect loops,
    /// invalid URLs and body decoding errors are not.
    pub fn from_reqwest(url: &Url, error: &reqwest::Error) -> Self {
        let retryable = error.is_timeout() || error.is_connect() || error.is_request();
        let cause = if error.is_timeout() {
            "request timed out".to_string()
        } else if error.is_redirect() {
            format!("redirect error: {}", error)
        } else {
            error.to_string()
        };

        Self {
            url: url.to_string(),
            status_code: error.status().map(|s| s.as_u16()),
            retryable,
            cause,
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// The User-Agent has the form `Name/Version (+ContactURL; ContactEmail)`.
/// Redirects are followed (up to 10 hops); the final URL is reported back.
///
/// # Example
///
/// ```no_run
/// use lantern_crawl::config::UserAgentConfig;
/// use lantern_crawl::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "Lantern".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Bounded-concurrency, polite HTTP fetcher shared by every crawl worker
pub struct Fetcher {
    client: Client,
    permits: Arc<Semaphore>,
    hosts: Mutex<HashMap<String, HostState>>,
    robots: RobotsCache,
    robots_agent: String,
    respect_robots: bool,
    download_delay: Duration,
    max_retries: u32,
    retry_backoff: Duration,
}

impl Fetcher {
    /// Creates a fetcher from configuration
    pub fn new(crawler: &CrawlerConfig, user_agent: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(
            user_agent,
            Duration::from_secs(crawler.request_timeout_secs),
        )?;
        Ok(Self::with_client(client, crawler, user_agent))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client, crawler: &CrawlerConfig, user_agent: &UserAgentConfig) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(crawler.max_concurrent_requests.max(1) as usize)),
            hosts: Mutex::new(HashMap::new()),
            robots: RobotsCache::new(),
            robots_agent: user_agent.crawler_name.clone(),
            respect_robots: crawler.respect_robots_txt,
            download_delay: Duration::from_millis(crawler.download_delay_ms),
            max_retries: crawler.max_retries,
            retry_backoff: Duration::from_millis(crawler.retry_backoff_ms),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Returns the robots.txt rules for the origin of `url`
    ///
    /// The first lookup for an origin fetches the file and applies its
    /// crawl-delay to the host.
    pub async fn robots_for(&self, url: &Url) -> Arc<ParsedRobots> {
        let robots = self.robots.get_or_fetch(&self.client, url).await;

        if let (Some(host), Some(delay)) =
            (extract_domain(url), robots.crawl_delay(&self.robots_agent))
        {
            let mut hosts = self.hosts.lock().unwrap_or_else(|e| e.into_inner());
            hosts.entry(host).or_default().crawl_delay = Some(delay.min(MAX_CRAWL_DELAY));
        }

        robots
    }

    /// Checks robots.txt for a URL (always true when robots.txt is ignored)
    pub async fn is_allowed(&self, url: &Url) -> bool {
        if !self.respect_robots {
            return true;
        }
        self.robots_for(url)
            .await
            .is_allowed(url.as_str(), &self.robots_agent)
    }

    /// Fetches a URL once
    ///
    /// # Returns
    ///
    /// * `Ok(FetchOutcome::Fetched)` - 2xx response with its body
    /// * `Ok(FetchOutcome::RobotsDisallowed)` - robots.txt forbids the URL
    /// * `Err(FetchError)` - Network error, timeout, or non-2xx status
    pub async fn fetch(&self, url: &Url) -> Result<FetchOutcome, FetchError> {
        if !self.is_allowed(url).await {
            return Ok(FetchOutcome::RobotsDisallowed);
        }

        self.throttle(url).await;

        let _permit = self.permits.acquire().await.map_err(|_| FetchError {
            url: url.to_string(),
            status_code: None,
            retryable: false,
            cause: "fetcher shut down".to_string(),
        })?;

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(url, status));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e))?;

        Ok(FetchOutcome::Fetched(FetchedPage {
            final_url,
            status_code: status.as_u16(),
            content_type,
            body: body.to_vec(),
        }))
    }

    /// Fetches a URL, retrying retryable failures with exponential backoff
    ///
    /// The wait before retry `n` (0-based) is `retry-backoff-ms * 2^n`.
    pub async fn fetch_with_retry(&self, url: &Url) -> Result<FetchOutcome, FetchError> {
        let mut attempt: u32 = 0;

        loop {
            match self.fetch(url).await {
                Err(e) if e.retryable && attempt < self.max_retries => {
                    let backoff = self.retry_backoff * 2u32.saturating_pow(attempt);
                    tracing::debug!(
                        url = %url,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        cause = %e.cause,
                        "retrying fetch"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Waits until the host of `url` may be contacted again
    async fn throttle(&self, url: &Url) {
        let Some(host) = extract_domain(url) else {
            return;
        };

        let wait = {
            let mut hosts = self.hosts.lock().unwrap_or_else(|e| e.into_inner());
            hosts
                .entry(host)
                .or_default()
                .reserve_slot(self.download_delay, Instant::now())
        };

        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}
