//! Full desktop browser session with fingerprint masking
//!
//! Slower than a plain fetch, so it only runs once direct fetching has failed
//! or been blocked. One bypass attempt is made inside the page source when the
//! first load looks like a challenge page.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{ExtractionStrategy, PagePipeline};
use crate::domain::errors::ScrapeError;
use crate::domain::product::{ScrapingResult, StrategyKind};
use crate::infrastructure::browser_session::{BrowserPageSource, BrowserProfile};
use crate::infrastructure::config::BrowserConfig;
use crate::infrastructure::page_source::PageSource;

pub const PRIORITY: u8 = 2;

pub struct StealthBrowser {
    source: Arc<dyn PageSource>,
    pipeline: Arc<PagePipeline>,
    enabled: bool,
}

impl StealthBrowser {
    pub fn new(config: &BrowserConfig, pipeline: Arc<PagePipeline>) -> Self {
        let source = BrowserPageSource::new(config.clone(), BrowserProfile::Desktop, StrategyKind::StealthBrowser);
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
impl ExtractionStrategy for StealthBrowser {
    fn kind(&self) -> StrategyKind {
        StrategyKind::StealthBrowser
    }

    fn priority(&self) -> u8 {
        PRIORITY
    }

    fn can_handle(&self, url: &str) -> bool {
        self.enabled && self.pipeline.validator().validate(url).is_valid
    }

    async fn scrape(&self, url: &str, cancel: &CancellationToken) -> Result<ScrapingResult, ScrapeError> {
        let target = self.pipeline.validator().clean(url);
        self.pipeline
            .scrape_with(self.source.as_ref(), url, &target, self.kind(), cancel)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::ExtractionConfig;
    use crate::infrastructure::page_source::FetchedPage;
    use crate::infrastructure::reference_data::ReferenceData;
    use std::sync::Mutex;

    const PRODUCT_PAGE: &str = include_str!("../../../tests/fixtures/protein_page.html");
    const CHALLENGE_PAGE: &str = include_str!("../../../tests/fixtures/blocked_page.html");

    struct Recording {
        body: &'static str,
        loaded: Mutex<Vec<String>>,
    }

    impl Recording {
        fn serving(body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                body,
                loaded: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl PageSource for Recording {
        async fn load(&self, url: &str, _cancel: &CancellationToken) -> Result<FetchedPage, ScrapeError> {
            self.loaded.lock().unwrap().push(url.to_string());
            Ok(FetchedPage::new(url, 200, self.body))
        }
    }

    fn pipeline() -> Arc<PagePipeline> {
        let data = Arc::new(ReferenceData::embedded().unwrap());
        Arc::new(PagePipeline::new(data, ExtractionConfig::default()).unwrap())
    }

    #[test]
    fn runs_second_in_the_chain() {
        let strategy = StealthBrowser::with_source(Recording::serving(PRODUCT_PAGE), pipeline());
        assert_eq!(strategy.kind(), StrategyKind::StealthBrowser);
        assert_eq!(strategy.priority(), PRIORITY);
        assert!(strategy.can_handle("https://www.amazon.co.uk/dp/B000QSNYGI"));
        assert!(!strategy.can_handle("https://example.com/dp/B000QSNYGI"));
    }

    #[test]
    fn disabled_browser_is_skipped() {
        let config = BrowserConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(!StealthBrowser::new(&config, pipeline()).can_handle("https://www.amazon.co.uk/dp/B000QSNYGI"));
    }

    #[tokio::test]
    async fn loads_the_cleaned_url_and_tags_the_result() {
        let source = Recording::serving(PRODUCT_PAGE);
        let strategy = StealthBrowser::with_source(source.clone(), pipeline());

        let result = strategy
            .scrape(
                "https://www.amazon.co.uk/dp/B000QSNYGI?tag=aff-21&utm_source=x&th=1",
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.strategy_used, StrategyKind::StealthBrowser);
        assert_eq!(result.asin, "B000QSNYGI");
        assert_eq!(
            source.loaded.lock().unwrap().as_slice(),
            ["https://www.amazon.co.uk/dp/B000QSNYGI?th=1"]
        );
    }

    #[tokio::test]
    async fn challenge_page_is_reported_as_blocked() {
        let strategy = StealthBrowser::with_source(Recording::serving(CHALLENGE_PAGE), pipeline());
        let err = strategy
            .scrape("https://www.amazon.co.uk/dp/B000QSNYGI", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_blocked());
    }
}
