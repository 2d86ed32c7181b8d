//! Page extraction against saved storefront documents

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use ecoscore_scraper_lib::application::strategies::{DirectFetch, ExtractionStrategy, PagePipeline};
use ecoscore_scraper_lib::domain::category::ProductCategory;
use ecoscore_scraper_lib::domain::errors::ScrapeError;
use ecoscore_scraper_lib::domain::product::{MaterialType, StrategyKind, UNKNOWN};
use ecoscore_scraper_lib::infrastructure::config::{ExtractionConfig, OrchestratorConfig};
use ecoscore_scraper_lib::infrastructure::page_source::{FetchedPage, PageSource};
use ecoscore_scraper_lib::infrastructure::reference_data::ReferenceData;
use ecoscore_scraper_lib::UnifiedScraper;

const PROTEIN_PAGE: &str = include_str!("fixtures/protein_page.html");
const BLOCKED_PAGE: &str = include_str!("fixtures/blocked_page.html");
const BRAND_ORIGIN_PAGE: &str = include_str!("fixtures/brand_origin_page.html");
const BOOK_PAGE: &str = include_str!("fixtures/book_page.html");

const PROTEIN_URL: &str = "https://www.amazon.co.uk/Optimum-Nutrition-Standard-Protein-Chocolate/dp/B000QSNYGI";
const MYPROTEIN_URL: &str = "https://www.amazon.co.uk/Myprotein-Impact-Whey-Protein-Vanilla/dp/B07QXYZ123";
const BOOK_URL: &str = "https://www.amazon.co.uk/Great-Gatsby-Penguin-Classics-Paperback/dp/0141182636";

fn data() -> Arc<ReferenceData> {
    Arc::new(ReferenceData::embedded().unwrap())
}

fn pipeline() -> Arc<PagePipeline> {
    Arc::new(PagePipeline::new(data(), ExtractionConfig::default()).unwrap())
}

/// Serves one fixed document for every URL
struct FixturePage(&'static str);

#[async_trait]
impl PageSource for FixturePage {
    async fn load(&self, url: &str, _cancel: &CancellationToken) -> Result<FetchedPage, ScrapeError> {
        Ok(FetchedPage::new(url, 200, self.0))
    }
}

#[test]
fn spec_table_weight_beats_nutrition_figures() {
    let page = FetchedPage::new(PROTEIN_URL, 200, PROTEIN_PAGE);
    let result = pipeline().process(PROTEIN_URL, &page, StrategyKind::DirectFetch).unwrap();

    assert!((result.weight_kg - 0.727).abs() < 1e-9, "weight was {}", result.weight_kg);
    assert!(result.title.starts_with("Optimum Nutrition Gold Standard"));
    assert_eq!(result.asin, "B000QSNYGI");
    assert_eq!(result.category, ProductCategory::Health);
    assert_eq!(result.origin, "USA");
    assert_eq!(result.material_type, MaterialType::Plastic);
    assert!(result.quality_score > 0);
}

#[test]
fn challenge_page_is_reported_as_blocked() {
    let page = FetchedPage::new(PROTEIN_URL, 200, BLOCKED_PAGE);
    let err = pipeline().process(PROTEIN_URL, &page, StrategyKind::DirectFetch).unwrap_err();

    assert!(err.is_blocked());
    assert_eq!(err.http_status(), Some(200));
}

#[test]
fn brand_table_supplies_origin_when_page_is_silent() {
    let page = FetchedPage::new(MYPROTEIN_URL, 200, BRAND_ORIGIN_PAGE);
    let result = pipeline().process(MYPROTEIN_URL, &page, StrategyKind::DirectFetch).unwrap();

    assert_eq!(result.origin, "UK");
    assert!(result.source_of("origin").is_some_and(|s| s.starts_with("brand_map:")));
}

#[test]
fn books_never_report_the_author_as_brand() {
    let page = FetchedPage::new(BOOK_URL, 200, BOOK_PAGE);
    let result = pipeline().process(BOOK_URL, &page, StrategyKind::DirectFetch).unwrap();

    assert_eq!(result.category, ProductCategory::Books);
    assert_eq!(result.material_type, MaterialType::Paper);
    assert_eq!(result.brand, UNKNOWN);
    assert_eq!(result.source_of("brand"), Some("not_applicable"));
    assert!(!result.brand.contains("Fitzgerald"));
}

#[tokio::test]
async fn direct_fetch_result_flows_through_the_orchestrator() {
    let strategy = DirectFetch::with_source(Arc::new(FixturePage(PROTEIN_PAGE)), pipeline());
    let strategies: Vec<Arc<dyn ExtractionStrategy>> = vec![Arc::new(strategy)];
    let scraper = UnifiedScraper::new(data(), OrchestratorConfig::default(), strategies);

    let result = scraper.scrape(PROTEIN_URL, false).await.unwrap();

    assert_eq!(result.strategy_used, StrategyKind::DirectFetch);
    assert_eq!(result.attempts.len(), 1);
    assert!(result.attempts[0].success);
    assert!(!result.cache_hit);
    assert_eq!(scraper.cache_stats().await.total_entries, 1);
}

#[tokio::test]
async fn blocked_direct_fetch_falls_back_to_url_estimate() {
    let strategy = DirectFetch::with_source(Arc::new(FixturePage(BLOCKED_PAGE)), pipeline());
    let strategies: Vec<Arc<dyn ExtractionStrategy>> = vec![Arc::new(strategy)];
    let scraper = UnifiedScraper::new(data(), OrchestratorConfig::default(), strategies);

    let result = scraper.scrape(PROTEIN_URL, false).await.unwrap();

    assert_eq!(result.strategy_used, StrategyKind::IntelligentFallback);
    assert_eq!(result.attempts.len(), 2);
    assert!(result.attempts[0].blocked);
    assert!(!result.errors_encountered.is_empty());
}
