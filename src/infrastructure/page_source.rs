//! Raw page acquisition seam shared by HTTP and browser fetchers

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::domain::errors::ScrapeError;

/// A fetched document before any parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// URL after redirects
    pub final_url: String,
    pub status: u16,
    pub body: String,
    pub elapsed: Duration,
}

impl FetchedPage {
    pub fn new(final_url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            final_url: final_url.into(),
            status,
            body: body.into(),
            elapsed: Duration::ZERO,
        }
    }
}

/// Something that can turn a URL into HTML
///
/// Each `load` call uses its own session (cookie jar or browser profile) so
/// concurrent scrapes never share identity.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn load(&self, url: &str, cancel: &CancellationToken) -> Result<FetchedPage, ScrapeError>;
}
