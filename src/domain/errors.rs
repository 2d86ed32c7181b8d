//! Scrape error taxonomy
//!
//! Only whole-strategy failures are errors. A missing attribute is a normal
//! outcome encoded as a sentinel plus a warning on the result.

use thiserror::Error;

use super::product::StrategyKind;

/// Coarse error category reported upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Parsing,
    System,
}

#[derive(Error, Debug, Clone)]
pub enum ScrapeError {
    #[error("Invalid input URL '{url}': {reason}")]
    InvalidInput { url: String, reason: String },

    #[error("Network failure for {url} via {strategy}: {message}")]
    NetworkFailure {
        url: String,
        strategy: StrategyKind,
        http_status: Option<u16>,
        message: String,
    },

    #[error("Product not found at {url} via {strategy} (HTTP {http_status})")]
    NotFound {
        url: String,
        strategy: StrategyKind,
        http_status: u16,
    },

    #[error("Blocked by anti-bot protection at {url} via {strategy}: {reason}")]
    BlockedByAntiBot {
        url: String,
        strategy: StrategyKind,
        http_status: Option<u16>,
        reason: String,
    },

    #[error("No usable data at {url} via {strategy}: {reason}")]
    ParsingFailure {
        url: String,
        strategy: StrategyKind,
        reason: String,
    },

    #[error("{strategy} timed out after {timeout_ms}ms for {url}")]
    Timeout {
        url: String,
        strategy: StrategyKind,
        timeout_ms: u64,
    },

    #[error("Browser session failed for {url} via {strategy}: {message}")]
    Browser {
        url: String,
        strategy: StrategyKind,
        message: String,
    },

    #[error("Scrape cancelled for {url}")]
    Cancelled { url: String },

    #[error("All strategies exhausted for {url}, including fallback: {last_error}")]
    AllStrategiesExhausted { url: String, last_error: String },
}

impl ScrapeError {
    pub fn invalid_input(url: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    pub fn network(url: &str, strategy: StrategyKind, http_status: Option<u16>, message: impl Into<String>) -> Self {
        Self::NetworkFailure {
            url: url.to_string(),
            strategy,
            http_status,
            message: message.into(),
        }
    }

    pub fn not_found(url: &str, strategy: StrategyKind, http_status: u16) -> Self {
        Self::NotFound {
            url: url.to_string(),
            strategy,
            http_status,
        }
    }

    pub fn timeout(url: &str, strategy: StrategyKind, timeout: std::time::Duration) -> Self {
        Self::Timeout {
            url: url.to_string(),
            strategy,
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn blocked(url: &str, strategy: StrategyKind, http_status: Option<u16>, reason: impl Into<String>) -> Self {
        Self::BlockedByAntiBot {
            url: url.to_string(),
            strategy,
            http_status,
            reason: reason.into(),
        }
    }

    pub fn parsing(url: &str, strategy: StrategyKind, reason: impl Into<String>) -> Self {
        Self::ParsingFailure {
            url: url.to_string(),
            strategy,
            reason: reason.into(),
        }
    }

    pub fn browser(url: &str, strategy: StrategyKind, message: impl Into<String>) -> Self {
        Self::Browser {
            url: url.to_string(),
            strategy,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NetworkFailure { .. } | Self::NotFound { .. } | Self::Timeout { .. } => ErrorCategory::Network,
            Self::BlockedByAntiBot { .. } | Self::ParsingFailure { .. } => ErrorCategory::Parsing,
            Self::InvalidInput { .. }
            | Self::Browser { .. }
            | Self::Cancelled { .. }
            | Self::AllStrategiesExhausted { .. } => ErrorCategory::System,
        }
    }

    /// Transient failures worth retrying within the same strategy
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkFailure { http_status, .. } => match http_status {
                None => true,
                Some(status) => *status == 429 || *status >= 500,
            },
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    pub fn is_terminal_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::BlockedByAntiBot { .. })
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::NetworkFailure { http_status: Some(429), .. })
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::NetworkFailure { http_status, .. } | Self::BlockedByAntiBot { http_status, .. } => *http_status,
            Self::NotFound { http_status, .. } => Some(*http_status),
            _ => None,
        }
    }

    pub fn strategy(&self) -> Option<StrategyKind> {
        match self {
            Self::NetworkFailure { strategy, .. }
            | Self::NotFound { strategy, .. }
            | Self::BlockedByAntiBot { strategy, .. }
            | Self::ParsingFailure { strategy, .. }
            | Self::Timeout { strategy, .. }
            | Self::Browser { strategy, .. } => Some(*strategy),
            _ => None,
        }
    }
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;
