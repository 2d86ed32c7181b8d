//! EcoScore scraper - product page scraping and attribute extraction
//!
//! Turns a storefront product URL into a fully populated [`ScrapingResult`]:
//! title, brand, origin, weight, dimensions, material and recyclability, each
//! with a provenance tag, plus a quality score. Several fetch strategies are
//! tried in order and a URL-only estimate closes the chain, so a valid URL
//! always yields a result.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{EcoEstimate, UnifiedScraper};
pub use domain::{ScrapeError, ScrapingResult};
pub use infrastructure::ScraperConfig;
