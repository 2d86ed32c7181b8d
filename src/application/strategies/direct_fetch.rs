//! Plain HTTP fetch of the cleaned product URL

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{ExtractionStrategy, PagePipeline};
use crate::domain::errors::ScrapeError;
use crate::domain::product::{ScrapingResult, StrategyKind};
use crate::infrastructure::config::HttpConfig;
use crate::infrastructure::http_client::HttpPageSource;
use crate::infrastructure::page_source::PageSource;

pub const PRIORITY: u8 = 1;

pub struct DirectFetch {
    source: Arc<dyn PageSource>,
    pipeline: Arc<PagePipeline>,
}

impl DirectFetch {
    pub fn new(config: &HttpConfig, pipeline: Arc<PagePipeline>) -> Result<Self> {
        let source = HttpPageSource::new(config.clone(), StrategyKind::DirectFetch)?;
        Ok(Self::with_source(Arc::new(source), pipeline))
    }

    pub fn with_source(source: Arc<dyn PageSource>, pipeline: Arc<PagePipeline>) -> Self {
        Self { source, pipeline }
    }
}

#[async_trait]
impl ExtractionStrategy for DirectFetch {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DirectFetch
    }

    fn priority(&self) -> u8 {
        PRIORITY
    }

    fn can_handle(&self, url: &str) -> bool {
        self.pipeline.validator().validate(url).is_valid
    }

    async fn scrape(&self, url: &str, cancel: &CancellationToken) -> Result<ScrapingResult, ScrapeError> {
        let target = self.pipeline.validator().clean(url);
        self.pipeline
            .scrape_with(self.source.as_ref(), url, &target, self.kind(), cancel)
            .await
    }
}
