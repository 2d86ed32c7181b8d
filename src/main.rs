//! Command-line entry point
//!
//! ```text
//! ecoscore-scraper <url> [--config <path>] [--force-refresh] [--transport air|ship|truck] [--json]
//! ```
//!
//! Prints a short summary of the scraped record and its eco estimate, or the
//! full report as pretty JSON with `--json`. Logs go to stderr (and optionally
//! a file).

use anyhow::Result;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use ecoscore_scraper_lib::UnifiedScraper;
use ecoscore_scraper_lib::application::eco_features::{self, EcoEstimate, TransportMode};
use ecoscore_scraper_lib::domain::ScrapingResult;
use ecoscore_scraper_lib::infrastructure::config::ScraperConfig;
use ecoscore_scraper_lib::infrastructure::logging;

#[derive(Parser, Debug)]
#[command(name = "ecoscore-scraper")]
#[command(about = "Scrape a product page and estimate its eco impact")]
#[command(version)]
struct Cli {
    /// Product page URL
    url: String,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ignore cached results
    #[arg(short, long)]
    force_refresh: bool,

    /// Transport mode for the carbon estimate; chosen from the route when omitted
    #[arg(short, long, value_enum)]
    transport: Option<Transport>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Transport {
    Air,
    Ship,
    Truck,
}

impl From<Transport> for TransportMode {
    fn from(value: Transport) -> Self {
        match value {
            Transport::Air => Self::Air,
            Transport::Ship => Self::Ship,
            Transport::Truck => Self::Truck,
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    product: &'a ScrapingResult,
    eco: EcoEstimate,
}

impl Report<'_> {
    fn summary(&self) -> String {
        let p = self.product;
        format!(
            "{title}\n  brand:    {brand}\n  origin:   {origin}\n  weight:   {weight:.3} kg\n  \
             material: {material} ({recyclability} recyclability)\n  quality:  {quality} ({confidence:?}, via {strategy})\n  \
             carbon:   {carbon:.3} kg CO2e by {mode} over {distance:.0} km",
            title = p.title,
            brand = p.brand,
            origin = p.origin,
            weight = p.weight_kg,
            material = p.material_type,
            recyclability = p.recyclability.as_str(),
            quality = p.quality_score,
            confidence = p.confidence_level,
            strategy = p.strategy_used,
            carbon = self.eco.carbon_kg,
            mode = self.eco.transport_mode,
            distance = self.eco.distance_km,
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ScraperConfig::load_or_default(cli.config.as_deref())?;
    logging::init_logging_with_config(&config.logging)?;

    info!("🚀 ecoscore-scraper {} starting", env!("CARGO_PKG_VERSION"));
    let scraper = UnifiedScraper::from_config(&config)?;
    let result = scraper.scrape(&cli.url, cli.force_refresh).await?;

    let report = Report {
        eco: eco_features::estimate(&result, cli.transport.map(TransportMode::from)),
        product: &result,
    };
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.summary());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use ecoscore_scraper_lib::domain::product::StrategyKind;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_url_and_flags_in_any_order() {
        let cli = Cli::try_parse_from([
            "ecoscore-scraper",
            "--force-refresh",
            "https://www.amazon.co.uk/dp/B000QSNYGI",
            "--config",
            "scraper.toml",
            "--transport",
            "air",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.url, "https://www.amazon.co.uk/dp/B000QSNYGI");
        assert_eq!(cli.config, Some(PathBuf::from("scraper.toml")));
        assert!(cli.force_refresh);
        assert!(cli.json);
        assert_eq!(cli.transport.map(TransportMode::from), Some(TransportMode::Air));
    }

    #[test]
    fn rejects_missing_url_and_unknown_values() {
        assert!(Cli::try_parse_from(["ecoscore-scraper"]).is_err());
        assert!(Cli::try_parse_from(["ecoscore-scraper", "https://x", "--verbose"]).is_err());
        assert!(Cli::try_parse_from(["ecoscore-scraper", "https://x", "--transport", "rocket"]).is_err());
        assert!(Cli::try_parse_from(["ecoscore-scraper", "https://x", "https://y"]).is_err());
    }

    #[test]
    fn summary_names_the_key_fields() {
        let mut product = ScrapingResult::unknown("B000QSNYGI", StrategyKind::DirectFetch);
        product.title = "Steel Water Bottle".to_string();
        product.origin = "China".to_string();
        let report = Report {
            eco: eco_features::estimate(&product, Some(TransportMode::Ship)),
            product: &product,
        };
        let summary = report.summary();
        assert!(summary.starts_with("Steel Water Bottle"));
        assert!(summary.contains("origin:   China"));
        assert!(summary.contains("by ship"));
    }
}
