//! Launching scrape runs as separate processes.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Starts one scrape in the background. Returning `Ok` means the scrape
/// was started, not that it succeeded; results arrive through the sink.
#[async_trait]
pub trait ScrapeLauncher: Send + Sync {
    async fn launch(&self, site: &str, search_text: &str, callback: &str) -> Result<()>;
}

/// Runs the `pricewatch-scrape` binary with the three values as separate
/// arguments. No shell is involved, so search text is passed verbatim.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    fn command(&self, site: &str, search_text: &str, callback: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(site)
            .arg(search_text)
            .arg(callback)
            .stdin(Stdio::null());
        cmd
    }
}

#[async_trait]
impl ScrapeLauncher for ProcessLauncher {
    async fn launch(&self, site: &str, search_text: &str, callback: &str) -> Result<()> {
        let mut child = self
            .command(site, search_text, callback)
            .spawn()
            .with_context(|| format!("failed to start {}", self.program.display()))?;

        let pid = child.id();
        tracing::info!(?pid, site, search_text, "Scraper started");

        let search_text = search_text.to_string();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => {
                    tracing::info!(?pid, %search_text, "Scraper finished")
                }
                Ok(status) => tracing::warn!(?pid, %search_text, %status, "Scraper failed"),
                Err(e) => tracing::warn!(?pid, %search_text, "Lost track of scraper: {e}"),
            }
        });
        Ok(())
    }
}
