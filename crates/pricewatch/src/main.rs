//! `pricewatch-scrape`: run one product search and deliver the results.

use std::sync::Arc;

use clap::Parser;

use pricewatch::browser::chromium::ChromiumConnector;
use pricewatch::{HttpSink, Orchestrator, ScrapeConfig, ScrapeError, ScrapeRequest, SiteRegistry};

#[derive(Parser)]
#[command(
    name = "pricewatch-scrape",
    about = "Search a retail site for products and post the listings to the price-history service",
    version
)]
struct Cli {
    /// Site to search (e.g. "https://amazon.ca").
    url: String,

    /// Search text; quote it if it contains spaces.
    search_text: String,

    /// Callback path on the result sink (e.g. "/results").
    callback: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config =
        ScrapeConfig::from_env().map_err(|e| ScrapeError::Config(format!("{e:#}")))?;
    let sink = HttpSink::new(config.sink_url.clone(), config.sink_timeout);
    let orchestrator = Orchestrator::new(
        Arc::new(ChromiumConnector),
        Arc::new(sink),
        SiteRegistry::builtin(),
        config,
    );

    let request = ScrapeRequest::new(cli.url, cli.search_text, cli.callback);
    let summary = orchestrator.run(&request).await?;

    tracing::info!(
        run_id = %summary.run_id,
        "Delivered {} products for {:?} to {}",
        summary.accepted,
        summary.search_text,
        summary.delivered_to
    );
    Ok(())
}
