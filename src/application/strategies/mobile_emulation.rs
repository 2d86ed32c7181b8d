//! Lightweight browser session posing as a phone, loading the mobile product path

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{ExtractionStrategy, PagePipeline};
use crate::domain::errors::ScrapeError;
use crate::domain::product::{ScrapingResult, StrategyKind};
use crate::infrastructure::browser_session::{BrowserPageSource, BrowserProfile};
use crate::infrastructure::config::BrowserConfig;
use crate::infrastructure::page_source::PageSource;

pub const PRIORITY: u8 = 3;

pub struct MobileEmulation {
    source: Arc<dyn PageSource>,
    pipeline: Arc<PagePipeline>,
    enabled: bool,
}

impl MobileEmulation {
    pub fn new(config: &BrowserConfig, pipeline: Arc<PagePipeline>) -> Self {
        let source = BrowserPageSource::new(config.clone(), BrowserProfile::Mobile, StrategyKind::MobileEmulation);
        Self {
            source: Arc::new(source),
            pipeline,
            enabled: config.enabled,
        }
    }

    pub fn with_source(source: Arc<dyn PageSource>, pipeline: Arc<PagePipeline>) -> Self {
        Self {
            source,
            pipeline,
            enabled: true,
        }
    }
}

#[async_trait]
impl ExtractionStrategy for MobileEmulation {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MobileEmulation
    }

    fn priority(&self) -> u8 {
        PRIORITY
    }

    fn can_handle(&self, url: &str) -> bool {
        self.enabled && self.pipeline.validator().validate(url).is_valid
    }

    async fn scrape(&self, url: &str, cancel: &CancellationToken) -> Result<ScrapingResult, ScrapeError> {
        let target = self.pipeline.validator().to_mobile(url);
        self.pipeline
            .scrape_with(self.source.as_ref(), url, &target, self.kind(), cancel)
            .await
    }
}
