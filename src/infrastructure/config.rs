//! Configuration infrastructure
//!
//! `ScraperConfig` is built once at process start and handed to the
//! orchestrator; nothing reads configuration from globals. Files are loaded
//! through the `config` crate (TOML, JSON or YAML) and layered with
//! `ECOSCORE__SECTION__KEY` environment overrides.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::domain::product::StrategyKind;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config from file: {source}")]
    FileLoad {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

impl ConfigError {
    fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Complete scraper configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub http: HttpConfig,
    pub browser: BrowserConfig,
    pub orchestrator: OrchestratorConfig,
    pub extraction: ExtractionConfig,
    pub logging: LoggingConfig,
    /// Directory with replacement reference tables; embedded tables are used when unset
    pub reference_data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub request_timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
    pub max_requests_per_second: u32,
    /// Rotated per request
    pub user_agents: Vec<String>,
    pub accept_language: String,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    /// Extra wait before retrying after HTTP 429
    pub rate_limit_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub enabled: bool,
    pub headless: bool,
    pub executable_path: Option<PathBuf>,
    /// Visit unrelated sites before the target to build a plausible session
    pub warm_up: bool,
    pub warm_up_urls: Vec<String>,
    pub navigation_timeout_seconds: u64,
    pub human_delay_min_ms: u64,
    pub human_delay_max_ms: u64,
    pub mobile_user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub cache_ttl_seconds: u64,
    /// Hard limit for a single strategy attempt
    pub strategy_timeout_seconds: u64,
    /// Limit for a whole scrape call; unset means no deadline
    pub overall_deadline_seconds: Option<u64>,
    pub enabled_strategies: Vec<StrategyKind>,
    /// Results at or above this score end the strategy chain; 0 accepts the first success
    pub good_enough_quality: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// A weight beyond this multiple of the category range is replaced by the midpoint
    pub outlier_factor: f64,
    pub min_weight_kg: f64,
    pub max_weight_kg: f64,
    pub max_brand_length: usize,
    pub max_title_length: usize,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,
    pub json_format: bool,
    pub console_output: bool,
    pub file_output: bool,
    /// Defaults to the platform data directory
    pub log_dir: Option<PathBuf>,
    pub file_prefix: String,
    /// "daily" or "never"
    pub rotation: String,
    /// Module-specific level filters (e.g. "reqwest": "warn")
    pub module_filters: HashMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            connect_timeout_seconds: defaults::CONNECT_TIMEOUT_SECONDS,
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
            user_agents: defaults::USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            accept_language: defaults::ACCEPT_LANGUAGE.to_string(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::RETRY_MAX_ATTEMPTS,
            base_delay_ms: defaults::RETRY_BASE_DELAY_MS,
            max_delay_ms: defaults::RETRY_MAX_DELAY_MS,
            backoff_multiplier: defaults::RETRY_BACKOFF_MULTIPLIER,
            rate_limit_delay_ms: defaults::RATE_LIMIT_DELAY_MS,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            headless: true,
            executable_path: None,
            warm_up: false,
            warm_up_urls: defaults::WARM_UP_URLS.iter().map(|s| s.to_string()).collect(),
            navigation_timeout_seconds: defaults::NAVIGATION_TIMEOUT_SECONDS,
            human_delay_min_ms: defaults::HUMAN_DELAY_MIN_MS,
            human_delay_max_ms: defaults::HUMAN_DELAY_MAX_MS,
            mobile_user_agent: defaults::MOBILE_USER_AGENT.to_string(),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: defaults::CACHE_TTL_SECONDS,
            strategy_timeout_seconds: defaults::STRATEGY_TIMEOUT_SECONDS,
            overall_deadline_seconds: Some(defaults::OVERALL_DEADLINE_SECONDS),
            enabled_strategies: vec![
                StrategyKind::DirectFetch,
                StrategyKind::StealthBrowser,
                StrategyKind::MobileEmulation,
                StrategyKind::IntelligentFallback,
            ],
            good_enough_quality: 0,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            outlier_factor: defaults::OUTLIER_FACTOR,
            min_weight_kg: defaults::MIN_WEIGHT_KG,
            max_weight_kg: defaults::MAX_WEIGHT_KG,
            max_brand_length: defaults::MAX_BRAND_LENGTH,
            max_title_length: defaults::MAX_TITLE_LENGTH,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            log_dir: None,
            file_prefix: "ecoscore-scraper".to_string(),
            rotation: "daily".to_string(),
            module_filters: HashMap::from([
                ("reqwest".to_string(), "warn".to_string()),
                ("hyper".to_string(), "warn".to_string()),
                ("chromiumoxide".to_string(), "warn".to_string()),
                ("html5ever".to_string(), "error".to_string()),
                ("selectors".to_string(), "warn".to_string()),
            ]),
        }
    }
}

impl OrchestratorConfig {
    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_secs(self.strategy_timeout_seconds)
    }

    pub fn overall_deadline(&self) -> Option<Duration> {
        self.overall_deadline_seconds.map(Duration::from_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn is_enabled(&self, kind: StrategyKind) -> bool {
        self.enabled_strategies.contains(&kind)
    }
}

impl ScraperConfig {
    /// Load from a file, layered with `ECOSCORE__*` environment overrides
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_sources(path, None)
    }

    /// `env` replaces the process environment when given
    fn from_sources(path: &Path, env: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix(defaults::ENV_PREFIX)
                    .separator("__")
                    .source(env),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit path, else the user config file if present, else defaults
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path).with_context(|| format!("Failed to load configuration from {path:?}"));
        }
        match Self::default_path() {
            Some(default_path) if default_path.exists() => {
                info!("Loading configuration from {:?}", default_path);
                Self::from_file(&default_path)
                    .with_context(|| format!("Failed to load configuration from {default_path:?}"))
            }
            _ => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// `<config dir>/ecoscore-scraper/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(defaults::APP_DIR_NAME).join("config.toml"))
    }

    /// Configuration value sanity checks
    pub fn validate(&self) -> Result<(), ConfigError> {
        let retry = &self.http.retry;
        if retry.max_attempts == 0 {
            return Err(ConfigError::validation("http.retry.max_attempts must be greater than 0"));
        }
        if retry.base_delay_ms > retry.max_delay_ms {
            return Err(ConfigError::validation(
                "http.retry.base_delay_ms cannot be greater than max_delay_ms",
            ));
        }
        if retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::validation("http.retry.backoff_multiplier must be at least 1.0"));
        }
        if self.http.max_requests_per_second == 0 {
            return Err(ConfigError::validation("http.max_requests_per_second must be greater than 0"));
        }
        if self.http.user_agents.is_empty() {
            return Err(ConfigError::validation("http.user_agents must not be empty"));
        }
        if self.orchestrator.strategy_timeout_seconds == 0 {
            return Err(ConfigError::validation(
                "orchestrator.strategy_timeout_seconds must be greater than 0",
            ));
        }
        if self.orchestrator.good_enough_quality > 100 {
            return Err(ConfigError::validation("orchestrator.good_enough_quality must be at most 100"));
        }
        if self.browser.human_delay_min_ms > self.browser.human_delay_max_ms {
            return Err(ConfigError::validation(
                "browser.human_delay_min_ms cannot be greater than human_delay_max_ms",
            ));
        }
        let extraction = &self.extraction;
        if !(extraction.min_weight_kg > 0.0 && extraction.min_weight_kg < extraction.max_weight_kg) {
            return Err(ConfigError::validation(
                "extraction weight bounds must satisfy 0 < min_weight_kg < max_weight_kg",
            ));
        }
        if extraction.outlier_factor < 1.0 {
            return Err(ConfigError::validation("extraction.outlier_factor must be at least 1.0"));
        }
        Ok(())
    }
}

/// Default configuration values
pub mod defaults {
    pub const APP_DIR_NAME: &str = "ecoscore-scraper";
    pub const ENV_PREFIX: &str = "ECOSCORE";

    pub const REQUEST_TIMEOUT_SECONDS: u64 = 20;
    pub const CONNECT_TIMEOUT_SECONDS: u64 = 10;
    pub const MAX_REQUESTS_PER_SECOND: u32 = 2;
    pub const ACCEPT_LANGUAGE: &str = "en-GB,en;q=0.9";

    pub const RETRY_MAX_ATTEMPTS: u32 = 3;
    pub const RETRY_BASE_DELAY_MS: u64 = 500;
    pub const RETRY_MAX_DELAY_MS: u64 = 8_000;
    pub const RETRY_BACKOFF_MULTIPLIER: f64 = 2.0;
    pub const RATE_LIMIT_DELAY_MS: u64 = 5_000;

    pub const NAVIGATION_TIMEOUT_SECONDS: u64 = 30;
    pub const HUMAN_DELAY_MIN_MS: u64 = 300;
    pub const HUMAN_DELAY_MAX_MS: u64 = 1_200;

    pub const CACHE_TTL_SECONDS: u64 = 3_600;
    pub const STRATEGY_TIMEOUT_SECONDS: u64 = 45;
    pub const OVERALL_DEADLINE_SECONDS: u64 = 120;

    pub const OUTLIER_FACTOR: f64 = 10.0;
    pub const MIN_WEIGHT_KG: f64 = 0.01;
    pub const MAX_WEIGHT_KG: f64 = 100.0;
    pub const MAX_BRAND_LENGTH: usize = 50;
    pub const MAX_TITLE_LENGTH: usize = 200;

    pub const LOG_LEVEL: &str = "info";

    pub const USER_AGENTS: &[&str] = &[
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Safari/605.1.15",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36 Edg/123.0.2420.81",
    ];

    pub const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1";

    pub const WARM_UP_URLS: &[&str] = &["https://www.google.com/", "https://www.bbc.co.uk/news"];
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = ScraperConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.extraction.outlier_factor, 10.0);
        assert_eq!(config.orchestrator.cache_ttl(), Duration::from_secs(3_600));
        assert!(config.orchestrator.is_enabled(StrategyKind::IntelligentFallback));
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[orchestrator]
cache_ttl_seconds = 60
enabled_strategies = ["direct_fetch", "intelligent_fallback"]

[extraction]
outlier_factor = 5.0
"#
        )
        .unwrap();

        let config = ScraperConfig::from_file(file.path()).unwrap();
        assert_eq!(config.orchestrator.cache_ttl_seconds, 60);
        assert!(!config.orchestrator.is_enabled(StrategyKind::StealthBrowser));
        assert_eq!(config.extraction.outlier_factor, 5.0);
        assert_eq!(config.extraction.max_title_length, 200);
        assert_eq!(config.http.retry.max_attempts, 3);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"http": {{"retry": {{"base_delay_ms": 9000, "max_delay_ms": 100}}}}}}"#).unwrap();

        let err = ScraperConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[http]\nmax_requests_per_second = 5\naccept_language = \"de-DE\"").unwrap();
        let env = HashMap::from([
            ("ECOSCORE__HTTP__MAX_REQUESTS_PER_SECOND".to_string(), "1".to_string()),
            ("ECOSCORE__ORCHESTRATOR__CACHE_TTL_SECONDS".to_string(), "90".to_string()),
            ("UNRELATED__HTTP__MAX_REQUESTS_PER_SECOND".to_string(), "9".to_string()),
        ]);

        let config = ScraperConfig::from_sources(file.path(), Some(env)).unwrap();
        assert_eq!(config.http.max_requests_per_second, 1);
        assert_eq!(config.http.accept_language, "de-DE");
        assert_eq!(config.orchestrator.cache_ttl_seconds, 90);
    }

    #[test]
    fn invalid_environment_override_is_rejected() {
        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        let env = HashMap::from([("ECOSCORE__HTTP__MAX_REQUESTS_PER_SECOND".to_string(), "0".to_string())]);
        let err = ScraperConfig::from_sources(file.path(), Some(env)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        assert!(ScraperConfig::load_or_default(Some(Path::new("/nonexistent/ecoscore.toml"))).is_err());
    }
}
