//! Scrape telemetry events
//!
//! One `ScrapeEvent` is recorded per strategy attempt and logged through
//! `tracing`; the full list travels with the returned result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::product::StrategyKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeEvent {
    pub url: String,
    pub strategy: StrategyKind,
    pub success: bool,
    pub latency_ms: u64,
    pub blocked: bool,
    pub quality_score: Option<u8>,
    pub error: Option<String>,
    pub at: DateTime<Utc>,
}

impl ScrapeEvent {
    pub fn succeeded(url: &str, strategy: StrategyKind, latency_ms: u64, quality_score: u8) -> Self {
        Self {
            url: url.to_string(),
            strategy,
            success: true,
            latency_ms,
            blocked: false,
            quality_score: Some(quality_score),
            error: None,
            at: Utc::now(),
        }
    }

    pub fn failed(url: &str, strategy: StrategyKind, latency_ms: u64, blocked: bool, error: String) -> Self {
        Self {
            url: url.to_string(),
            strategy,
            success: false,
            latency_ms,
            blocked,
            quality_score: None,
            error: Some(error),
            at: Utc::now(),
        }
    }

    /// Emit the event as a structured log line
    pub fn log(&self) {
        if self.success {
            tracing::info!(
                url = %self.url,
                strategy = %self.strategy,
                latency_ms = self.latency_ms,
                quality = self.quality_score.unwrap_or_default(),
                "strategy succeeded"
            );
        } else {
            tracing::warn!(
                url = %self.url,
                strategy = %self.strategy,
                latency_ms = self.latency_ms,
                blocked = self.blocked,
                error = self.error.as_deref().unwrap_or(""),
                "strategy failed"
            );
        }
    }
}
