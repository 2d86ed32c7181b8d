//! Domain module - product records, categories, URLs and the error taxonomy
//!
//! Modern Rust module organization (Rust 2018+ style): each module is its own
//! file in the `domain/` directory; common items are re-exported here.

pub mod category;
pub mod errors;
pub mod events;
pub mod product;
pub mod product_url;

pub use category::{CategoryInfo, CategoryRules, DetectionMethod, ProductCategory};
pub use errors::{ErrorCategory, ScrapeError, ScrapeResult};
pub use events::ScrapeEvent;
pub use product::{ConfidenceLevel, MaterialType, Recyclability, ScrapingResult, StrategyKind, UNKNOWN};
pub use product_url::{ProductUrl, UrlCandidate, UrlType, UrlValidation, UrlVariant};
