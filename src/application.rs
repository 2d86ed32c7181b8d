//! Application layer: extraction strategies and the orchestrator that chains them

pub mod eco_features;
pub mod strategies;
pub mod unified_scraper;

pub use eco_features::{EcoEstimate, FeatureVector, TransportMode};
pub use strategies::{ExtractionStrategy, IntelligentFallback, PagePipeline};
pub use unified_scraper::UnifiedScraper;
