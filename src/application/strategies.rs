//! Extraction strategies
//!
//! Each strategy acquires a product page through its own channel and runs the
//! shared [`PagePipeline`] over it. The orchestrator tries them in ascending
//! `priority()`; [`IntelligentFallback`] always succeeds and closes the chain.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::errors::ScrapeError;
use crate::domain::product::{ScrapingResult, StrategyKind};

pub mod direct_fetch;
pub mod fallback;
pub mod mobile_emulation;
pub mod pipeline;
pub mod stealth_browser;

pub use direct_fetch::DirectFetch;
pub use fallback::IntelligentFallback;
pub use mobile_emulation::MobileEmulation;
pub use pipeline::PagePipeline;
pub use stealth_browser::StealthBrowser;

#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Lower runs first
    fn priority(&self) -> u8;

    fn can_handle(&self, url: &str) -> bool;

    /// A populated result, or the reason this channel produced none
    async fn scrape(&self, url: &str, cancel: &CancellationToken) -> Result<ScrapingResult, ScrapeError>;
}
