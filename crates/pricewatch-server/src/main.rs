//! `pricewatch-server`: the price-history HTTP service.

use anyhow::{Context, Result};
use clap::Parser;
use pricewatch_server::{AppState, HistoryStore, ProcessLauncher};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pricewatch-server", version, about = "Serve and record product price history")]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "PRICEWATCH_ADDR", default_value = "127.0.0.1:5000")]
    addr: SocketAddr,

    /// SQLite database file [default: ~/.pricewatch/history.db]
    #[arg(long, env = "PRICEWATCH_DB")]
    db: Option<PathBuf>,

    /// Scraper executable launched for each scrape.
    #[arg(long, env = "PRICEWATCH_SCRAPER_BIN", default_value = "pricewatch-scrape")]
    scraper_bin: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db = cli.db.unwrap_or_else(HistoryStore::default_path);
    let store = HistoryStore::open(&db)
        .with_context(|| format!("failed to open history database {}", db.display()))?;
    tracing::info!("Using history database {}", db.display());

    let state = AppState::new(store, Arc::new(ProcessLauncher::new(cli.scraper_bin)));
    pricewatch_server::serve(cli.addr, state).await
}
