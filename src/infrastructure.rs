//! Infrastructure layer: configuration, logging, page acquisition, parsing and scoring
//!
//! Everything here is a building block for the strategies in `application`.

pub mod browser_session;
pub mod category_classifier;
pub mod config;
pub mod http_client;
pub mod logging;
pub mod page_source;
pub mod parsing;
pub mod quality;
pub mod reference_data;
pub mod result_cache;
pub mod retry_policy;
pub mod url_validator;

pub use browser_session::{BrowserPageSource, BrowserProfile, BrowserSession};
pub use category_classifier::CategoryClassifier;
pub use config::{ConfigError, ScraperConfig};
pub use http_client::{HttpClient, HttpPageSource};
pub use logging::{init_logging, init_logging_with_config};
pub use page_source::{FetchedPage, PageSource};
pub use quality::{apply_quality, quality_score};
pub use reference_data::ReferenceData;
pub use result_cache::{CacheStats, ResultCache};
pub use retry_policy::RetryPolicy;
pub use url_validator::UrlValidator;
