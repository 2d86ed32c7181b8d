//! Logging system configuration and initialization
//!
//! - Console output and/or non-blocking file output with daily or no rotation
//! - Optional structured JSON formatting
//! - `RUST_LOG` overrides the configured level; without it, noisy dependency
//!   targets are capped unless the level is `trace`

use anyhow::{Context, Result, anyhow};
use once_cell::sync::Lazy;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub use crate::infrastructure::config::LoggingConfig;
use crate::infrastructure::config::defaults::APP_DIR_NAME;

// Keeps the file writers alive for the life of the process
static LOG_GUARDS: Lazy<Mutex<Vec<WorkerGuard>>> = Lazy::new(|| Mutex::new(Vec::new()));

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize the logging system with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Initialize logging with custom configuration
///
/// # Environment Variable Override
/// ```bash
/// RUST_LOG="debug,reqwest=debug,chromiumoxide=debug" ecoscore-scraper <url>
/// ```
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_filter(config)?,
    };

    let mut layers: Vec<BoxedLayer> = Vec::new();

    if config.file_output {
        let log_dir = log_directory(config);
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory {log_dir:?}"))?;

        let file_name = format!("{}.log", config.file_prefix);
        let appender = match config.rotation.as_str() {
            "never" => rolling::never(&log_dir, &file_name),
            _ => rolling::daily(&log_dir, &file_name),
        };
        let (file_writer, guard) = non_blocking(appender);
        LOG_GUARDS.lock().unwrap_or_else(PoisonError::into_inner).push(guard);

        let file_layer = fmt::Layer::new()
            .with_writer(file_writer)
            .with_timer(fmt::time::ChronoUtc::rfc_3339())
            .with_ansi(false);
        layers.push(if config.json_format {
            file_layer
                .json()
                .with_target(true)
                .with_current_span(true)
                .boxed()
        } else {
            file_layer.with_target(false).boxed()
        });
    }

    if config.console_output {
        let console_layer = fmt::Layer::new()
            .with_writer(std::io::stderr)
            .with_timer(fmt::time::ChronoUtc::rfc_3339())
            .with_target(false);
        layers.push(if config.json_format {
            console_layer.json().boxed()
        } else {
            console_layer.boxed()
        });
    }

    Registry::default()
        .with(layers)
        .with(env_filter)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    info!(
        level = %config.level,
        json = config.json_format,
        file = config.file_output,
        "Logging initialized"
    );
    Ok(())
}

/// Level filter from configuration alone, ignoring `RUST_LOG`
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let mut filter =
        EnvFilter::try_new(&config.level).with_context(|| format!("Invalid log level '{}'", config.level))?;

    if !config.level.to_lowercase().contains("trace") {
        let mut modules: Vec<_> = config.module_filters.iter().collect();
        modules.sort();
        for (module, level) in modules {
            let directive = format!("{module}={level}")
                .parse()
                .with_context(|| format!("Invalid module filter '{module}={level}'"))?;
            filter = filter.add_directive(directive);
        }
    }
    Ok(filter)
}

/// Configured directory, else `<data dir>/ecoscore-scraper/logs`, else `./logs`
pub fn log_directory(config: &LoggingConfig) -> PathBuf {
    config.log_dir.clone().unwrap_or_else(|| {
        dirs::data_local_dir()
            .map(|dir| dir.join(APP_DIR_NAME).join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_targets_are_capped_below_trace() {
        let filter = build_filter(&LoggingConfig::default()).unwrap().to_string();
        assert!(filter.contains("reqwest=warn"));
        assert!(filter.contains("chromiumoxide=warn"));

        let config = LoggingConfig {
            level: "trace".to_string(),
            ..Default::default()
        };
        let filter = build_filter(&config).unwrap().to_string();
        assert!(!filter.contains("reqwest"));
    }

    #[test]
    fn invalid_module_filter_is_reported() {
        let mut config = LoggingConfig::default();
        config.module_filters.insert("reqwest".to_string(), "loud".to_string());
        assert!(build_filter(&config).is_err());
    }

    #[test]
    fn explicit_log_dir_wins() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            log_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        assert_eq!(log_directory(&config), dir.path());
    }
}
