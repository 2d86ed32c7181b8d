//! HTTP client for product page fetching
//!
//! Wraps `reqwest` with a cookie jar, browser-like headers, a rotating
//! user-agent pool and a `governor` rate limiter. Every request honours a
//! `CancellationToken`. HTTP statuses are mapped onto `ScrapeError` so the
//! retry policy can tell transient failures from terminal ones.

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use reqwest::{
    Client,
    header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderName, HeaderValue, USER_AGENT},
};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::errors::ScrapeError;
use crate::domain::product::StrategyKind;
use crate::infrastructure::config::HttpConfig;
use crate::infrastructure::page_source::{FetchedPage, PageSource};
use crate::infrastructure::retry_policy::RetryPolicy;

const MAX_REDIRECTS: usize = 10;

/// Headers a desktop browser sends on a top-level navigation
fn browser_headers(accept_language: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_str(accept_language).context("Invalid Accept-Language header")?,
    );
    for (name, value) in [
        ("upgrade-insecure-requests", "1"),
        ("sec-fetch-dest", "document"),
        ("sec-fetch-mode", "navigate"),
        ("sec-fetch-site", "none"),
        ("sec-fetch-user", "?1"),
        ("dnt", "1"),
    ] {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    Ok(headers)
}

/// Map a response status onto the error taxonomy; `Ok` for 2xx
pub fn check_status(url: &str, strategy: StrategyKind, status: u16) -> Result<(), ScrapeError> {
    match status {
        200..=299 => Ok(()),
        404 | 410 => Err(ScrapeError::not_found(url, strategy, status)),
        403 => Err(ScrapeError::blocked(url, strategy, Some(status), "HTTP 403 Forbidden")),
        _ => Err(ScrapeError::network(url, strategy, Some(status), format!("HTTP status {status}"))),
    }
}

/// Process-wide request budget shared by every client of one page source
pub type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

pub fn rate_limiter(config: &HttpConfig) -> Result<SharedRateLimiter> {
    let quota = Quota::per_second(
        NonZeroU32::new(config.max_requests_per_second).context("Rate limit must be greater than 0")?,
    );
    Ok(Arc::new(RateLimiter::direct(quota)))
}

/// Rate-limited HTTP client with its own cookie jar
pub struct HttpClient {
    client: Client,
    rate_limiter: SharedRateLimiter,
    user_agents: Vec<String>,
    request_timeout: Duration,
    strategy: StrategyKind,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Self::with_rate_limiter(config, rate_limiter(config)?)
    }

    /// Fresh client and cookie jar drawing on an existing request budget
    pub fn with_rate_limiter(config: &HttpConfig, rate_limiter: SharedRateLimiter) -> Result<Self> {
        let request_timeout = Duration::from_secs(config.request_timeout_seconds);
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .default_headers(browser_headers(&config.accept_language)?)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .context("Failed to create HTTP client")?;

        if config.user_agents.is_empty() {
            anyhow::bail!("User-agent pool is empty");
        }

        Ok(Self {
            client,
            rate_limiter,
            user_agents: config.user_agents.clone(),
            request_timeout,
            strategy: StrategyKind::DirectFetch,
        })
    }

    /// Strategy reported on errors raised by this client
    #[must_use]
    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    /// A user agent picked at random from the pool
    pub fn next_user_agent(&self) -> &str {
        &self.user_agents[fastrand::usize(..self.user_agents.len())]
    }

    /// GET `url` and return the body of a 2xx response
    pub async fn fetch_page(&self, url: &str, cancel: &CancellationToken) -> Result<FetchedPage, ScrapeError> {
        let cancelled = || ScrapeError::Cancelled { url: url.to_string() };
        if cancel.is_cancelled() {
            return Err(cancelled());
        }

        tokio::select! {
            () = self.rate_limiter.until_ready() => {},
            () = cancel.cancelled() => return Err(cancelled()),
        }

        info!(url, strategy = %self.strategy, "Fetching page");
        let started = Instant::now();

        let request = self.client.get(url).header(USER_AGENT, self.next_user_agent());
        let response = tokio::select! {
            result = request.send() => result.map_err(|e| self.transport_error(url, &e))?,
            () = cancel.cancelled() => {
                warn!("HTTP request cancelled for URL: {}", url);
                return Err(cancelled());
            }
        };

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        check_status(url, self.strategy, status)?;

        let body = tokio::select! {
            result = response.text() => result.map_err(|e| self.transport_error(url, &e))?,
            () = cancel.cancelled() => {
                warn!("Response reading cancelled for URL: {}", url);
                return Err(cancelled());
            }
        };

        let elapsed = started.elapsed();
        debug!("Fetched {} ({}, {} bytes in {:?})", final_url, status, body.len(), elapsed);
        Ok(FetchedPage {
            final_url,
            status,
            body,
            elapsed,
        })
    }

    fn transport_error(&self, url: &str, error: &reqwest::Error) -> ScrapeError {
        if error.is_timeout() {
            ScrapeError::timeout(url, self.strategy, self.request_timeout)
        } else {
            ScrapeError::network(url, self.strategy, None, error.to_string())
        }
    }
}

/// `PageSource` that opens a fresh `HttpClient` per load and retries transient failures.
/// All loads draw on one rate limiter.
pub struct HttpPageSource {
    config: HttpConfig,
    rate_limiter: SharedRateLimiter,
    retry: RetryPolicy,
    strategy: StrategyKind,
}

impl HttpPageSource {
    pub fn new(config: HttpConfig, strategy: StrategyKind) -> Result<Self> {
        if config.user_agents.is_empty() {
            anyhow::bail!("User-agent pool is empty");
        }
        Ok(Self {
            rate_limiter: rate_limiter(&config)?,
            retry: RetryPolicy::from_config(&config.retry),
            config,
            strategy,
        })
    }

    fn client(&self) -> Result<HttpClient> {
        Ok(HttpClient::with_rate_limiter(&self.config, Arc::clone(&self.rate_limiter))?.with_strategy(self.strategy))
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn load(&self, url: &str, cancel: &CancellationToken) -> Result<FetchedPage, ScrapeError> {
        let client = self
            .client()
            .map_err(|e| ScrapeError::network(url, self.strategy, None, format!("{e:#}")))?;
        let client = &client;
        self.retry
            .run(url, cancel, move |attempt| {
                debug!(url, attempt, "HTTP attempt");
                client.fetch_page(url, cancel)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const URL: &str = "https://www.amazon.co.uk/dp/B000QSNYGI";

    #[rstest]
    #[case(200, None)]
    #[case(204, None)]
    #[case(404, Some("not_found"))]
    #[case(410, Some("not_found"))]
    #[case(403, Some("blocked"))]
    #[case(429, Some("retryable"))]
    #[case(503, Some("retryable"))]
    #[case(400, Some("terminal"))]
    fn statuses_map_onto_the_taxonomy(#[case] status: u16, #[case] expected: Option<&str>) {
        let outcome = check_status(URL, StrategyKind::DirectFetch, status).err().map(|e| {
            if e.is_terminal_not_found() {
                "not_found"
            } else if e.is_blocked() {
                "blocked"
            } else if e.is_retryable() {
                "retryable"
            } else {
                "terminal"
            }
        });
        assert_eq!(outcome, expected);
    }

    #[test]
    fn user_agents_come_from_the_pool() {
        let config = HttpConfig::default();
        let client = HttpClient::new(&config).unwrap();
        for _ in 0..20 {
            assert!(config.user_agents.iter().any(|ua| ua == client.next_user_agent()));
        }
    }

    #[test]
    fn rejects_zero_rate_and_empty_pool() {
        let zero_rate = HttpConfig {
            max_requests_per_second: 0,
            ..Default::default()
        };
        assert!(HttpClient::new(&zero_rate).is_err());

        let no_agents = HttpConfig {
            user_agents: Vec::new(),
            ..Default::default()
        };
        assert!(HttpClient::new(&no_agents).is_err());
    }

    #[test]
    fn headers_look_like_a_browser_navigation() {
        let headers = browser_headers("en-GB,en;q=0.9").unwrap();
        assert_eq!(headers.get(ACCEPT_LANGUAGE).unwrap(), "en-GB,en;q=0.9");
        assert_eq!(headers.get("sec-fetch-mode").unwrap(), "navigate");
    }

    #[test]
    fn loads_share_one_request_budget() {
        let config = HttpConfig {
            max_requests_per_second: 1,
            ..Default::default()
        };
        let source = HttpPageSource::new(config, StrategyKind::DirectFetch).unwrap();
        let first = source.client().unwrap();
        let second = source.client().unwrap();

        assert!(first.rate_limiter.check().is_ok());
        assert!(second.rate_limiter.check().is_err());
        assert!(HttpClient::new(&HttpConfig::default()).unwrap().rate_limiter.check().is_ok());
    }

    #[test]
    fn page_source_rejects_invalid_config() {
        let zero_rate = HttpConfig {
            max_requests_per_second: 0,
            ..Default::default()
        };
        assert!(HttpPageSource::new(zero_rate, StrategyKind::DirectFetch).is_err());
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let client = HttpClient::new(&HttpConfig::default()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = client.fetch_page(URL, &cancel).await;
        assert!(matches!(result, Err(ScrapeError::Cancelled { .. })));
    }
}
