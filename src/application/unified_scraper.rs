//! Strategy orchestrator
//!
//! Tries the configured strategies in ascending priority, each under a hard
//! timeout and the optional overall deadline, and falls back to the URL-only
//! estimate when none produce data. Successful real results are cached by
//! normalised URL.

use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::application::strategies::pipeline::elapsed_ms;
use crate::application::strategies::{
    DirectFetch, ExtractionStrategy, IntelligentFallback, MobileEmulation, PagePipeline, StealthBrowser,
};
use crate::domain::errors::ScrapeError;
use crate::domain::events::ScrapeEvent;
use crate::domain::product::{ScrapingResult, StrategyKind};
use crate::infrastructure::config::{OrchestratorConfig, ScraperConfig};
use crate::infrastructure::reference_data::ReferenceData;
use crate::infrastructure::result_cache::{CacheStats, ResultCache};
use crate::infrastructure::url_validator::UrlValidator;

/// Time a timed-out strategy gets to wind down after its token is cancelled
pub const CANCEL_GRACE: Duration = Duration::from_secs(2);

pub struct UnifiedScraper {
    strategies: Vec<Arc<dyn ExtractionStrategy>>,
    fallback: Arc<dyn ExtractionStrategy>,
    validator: UrlValidator,
    cache: ResultCache,
    config: OrchestratorConfig,
}

/// What the strategy loop produced before any fallback
struct Attempts {
    events: Vec<ScrapeEvent>,
    errors: Vec<String>,
    best: Option<ScrapingResult>,
}

impl UnifiedScraper {
    /// Orchestrator over `strategies`, closed by the URL-keyword fallback
    pub fn new(data: Arc<ReferenceData>, config: OrchestratorConfig, strategies: Vec<Arc<dyn ExtractionStrategy>>) -> Self {
        let mut strategies = strategies;
        strategies.sort_by_key(|s| s.priority());
        Self {
            fallback: Arc::new(IntelligentFallback::new(Arc::clone(&data))),
            validator: UrlValidator::new(data),
            cache: ResultCache::new(config.cache_ttl()),
            strategies,
            config,
        }
    }

    /// Build the standard strategy chain from configuration
    pub fn from_config(config: &ScraperConfig) -> Result<Self> {
        let data = Arc::new(match &config.reference_data_dir {
            Some(dir) => ReferenceData::from_dir(dir)?,
            None => ReferenceData::embedded()?,
        });
        let pipeline = Arc::new(PagePipeline::new(Arc::clone(&data), config.extraction.clone())?);
        let orchestrator = &config.orchestrator;

        let mut strategies: Vec<Arc<dyn ExtractionStrategy>> = Vec::new();
        if orchestrator.is_enabled(StrategyKind::DirectFetch) {
            strategies.push(Arc::new(DirectFetch::new(&config.http, Arc::clone(&pipeline))?));
        }
        if orchestrator.is_enabled(StrategyKind::StealthBrowser) {
            strategies.push(Arc::new(StealthBrowser::new(&config.browser, Arc::clone(&pipeline))));
        }
        if orchestrator.is_enabled(StrategyKind::MobileEmulation) {
            strategies.push(Arc::new(MobileEmulation::new(&config.browser, Arc::clone(&pipeline))));
        }

        info!(
            strategies = ?strategies.iter().map(|s| s.name()).collect::<Vec<_>>(),
            cache_ttl_seconds = orchestrator.cache_ttl_seconds,
            "Scraper ready"
        );
        Ok(Self::new(data, orchestrator.clone(), strategies))
    }

    /// Replace the closing fallback strategy
    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn ExtractionStrategy>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    pub async fn scrape(&self, url: &str, force_refresh: bool) -> Result<ScrapingResult, ScrapeError> {
        self.scrape_with_cancel(url, force_refresh, CancellationToken::new()).await
    }

    /// Scrape with a caller-owned cancellation token; cancelling ends the
    /// strategy loop and returns the best result so far or the fallback
    pub async fn scrape_with_cancel(
        &self,
        url: &str,
        force_refresh: bool,
        cancel: CancellationToken,
    ) -> Result<ScrapingResult, ScrapeError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("scrape", %request_id, url = %url.trim());
        self.run(url.trim(), force_refresh, cancel).instrument(span).await
    }

    async fn run(&self, url: &str, force_refresh: bool, cancel: CancellationToken) -> Result<ScrapingResult, ScrapeError> {
        let started = Instant::now();
        if url.is_empty() {
            return Err(ScrapeError::invalid_input(url, "URL is empty"));
        }
        if !self.validator.is_well_formed(url) {
            return Err(ScrapeError::invalid_input(url, "not an absolute http(s) URL"));
        }

        let normalized = self.validator.clean(url);
        if !force_refresh {
            if let Some(mut cached) = self.cache.get(&normalized).await {
                debug!("Cache hit");
                cached.cache_hit = true;
                cached.extraction_time_ms = elapsed_ms(started);
                return Ok(cached);
            }
        }

        let validation = self.validator.validate(url);
        if !validation.is_valid {
            warn!(issues = ?validation.issues, "URL is not a product page; only the fallback applies");
        }

        let attempts = self.try_strategies(url, started, &cancel).await;
        let Attempts {
            mut events,
            mut errors,
            best,
        } = attempts;

        let (mut result, cacheable) = match best {
            Some(result) => (result, true),
            None => (self.run_fallback(url, &mut events, &mut errors).await?, false),
        };

        errors.append(&mut result.errors_encountered);
        result.errors_encountered = errors;
        result.attempts = events;
        result.cache_hit = false;
        result.extraction_time_ms = elapsed_ms(started);

        if cacheable {
            self.cache.insert(&normalized, result.clone()).await;
        }
        info!(
            strategy = %result.strategy_used,
            quality = result.quality_score,
            confidence = ?result.confidence_level,
            elapsed_ms = result.extraction_time_ms,
            "Scrape finished"
        );
        Ok(result)
    }

    async fn try_strategies(&self, url: &str, started: Instant, cancel: &CancellationToken) -> Attempts {
        let deadline = self.config.overall_deadline().map(|d| started + d);
        let mut attempts = Attempts {
            events: Vec::new(),
            errors: Vec::new(),
            best: None,
        };

        for strategy in &self.strategies {
            if !strategy.can_handle(url) {
                debug!(strategy = strategy.name(), "Strategy cannot handle URL");
                continue;
            }
            if cancel.is_cancelled() {
                warn!("Scrape cancelled; skipping remaining strategies");
                break;
            }
            let budget = match remaining(deadline) {
                Some(left) if left.is_zero() => {
                    warn!("Overall deadline exceeded; skipping remaining strategies");
                    break;
                }
                Some(left) => left.min(self.config.strategy_timeout()),
                None => self.config.strategy_timeout(),
            };

            let attempt_started = Instant::now();
            let token = cancel.child_token();
            let scrape = strategy.scrape(url, &token);
            tokio::pin!(scrape);
            let outcome = match tokio::time::timeout(budget, &mut scrape).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    // Signal first so the strategy can release its browser before being dropped
                    token.cancel();
                    if tokio::time::timeout(CANCEL_GRACE, &mut scrape).await.is_err() {
                        warn!(strategy = strategy.name(), "Strategy ignored cancellation; dropping it");
                    }
                    Err(ScrapeError::timeout(url, strategy.kind(), budget))
                }
            };
            let latency_ms = elapsed_ms(attempt_started);

            match outcome {
                Ok(result) => {
                    let event = ScrapeEvent::succeeded(url, strategy.kind(), latency_ms, result.quality_score);
                    event.log();
                    attempts.events.push(event);

                    let good_enough = result.quality_score >= self.config.good_enough_quality;
                    if attempts
                        .best
                        .as_ref()
                        .is_none_or(|best| result.quality_score > best.quality_score)
                    {
                        attempts.best = Some(result);
                    }
                    if good_enough {
                        break;
                    }
                }
                Err(e) => {
                    let event = ScrapeEvent::failed(url, strategy.kind(), latency_ms, e.is_blocked(), e.to_string());
                    event.log();
                    attempts.events.push(event);
                    if e.is_terminal_not_found() {
                        info!(strategy = strategy.name(), "Product not found via this channel");
                    }
                    let cancelled = matches!(e, ScrapeError::Cancelled { .. });
                    attempts.errors.push(e.to_string());
                    if cancelled {
                        break;
                    }
                }
            }
        }
        attempts
    }

    async fn run_fallback(
        &self,
        url: &str,
        events: &mut Vec<ScrapeEvent>,
        errors: &mut Vec<String>,
    ) -> Result<ScrapingResult, ScrapeError> {
        let started = Instant::now();
        let outcome = self.fallback.scrape(url, &CancellationToken::new()).await;
        let latency_ms = elapsed_ms(started);
        match outcome {
            Ok(result) => {
                let event = ScrapeEvent::succeeded(url, self.fallback.kind(), latency_ms, result.quality_score);
                event.log();
                events.push(event);
                Ok(result)
            }
            Err(e) => {
                error!(error = %e, "Fallback strategy failed; this is a defect");
                let event = ScrapeEvent::failed(url, self.fallback.kind(), latency_ms, e.is_blocked(), e.to_string());
                event.log();
                events.push(event);
                errors.push(e.to_string());
                Err(ScrapeError::AllStrategiesExhausted {
                    url: url.to_string(),
                    last_error: e.to_string(),
                })
            }
        }
    }
}

fn remaining(deadline: Option<Instant>) -> Option<Duration> {
    deadline.map(|d| d.saturating_duration_since(Instant::now()))
}
