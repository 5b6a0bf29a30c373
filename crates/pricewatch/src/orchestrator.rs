//! Scrape orchestrator: one run from site lookup to result delivery.
//!
//! ```text
//! Idle → Connecting → Navigated → Searching → Collecting → Delivering → Done
//!   └──────────┴───────────┴───────────┴────────────┴────────────┴──→ Failed(kind)
//! ```
//!
//! Once a browser session is open it is closed exactly once, whichever way
//! the run ends, before control returns to the caller.

use crate::browser::{BrowserConnector, BrowserSession};
use crate::collect::collect;
use crate::config::ScrapeConfig;
use crate::error::{FailureKind, ScrapeError};
use crate::search::SearchDriver;
use crate::sink::ResultSink;
use crate::sites::{SiteEntry, SiteRegistry};
use crate::types::{ResultBatch, ScrapeRequest};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeState {
    Idle,
    Connecting,
    Navigated,
    Searching,
    Collecting,
    Delivering,
    Done,
    Failed(FailureKind),
}

impl ScrapeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScrapeState::Done | ScrapeState::Failed(_))
    }
}

/// State of one run, with every state it passed through.
#[derive(Debug, Clone)]
pub struct ScrapeRun {
    id: Uuid,
    history: Vec<ScrapeState>,
}

impl Default for ScrapeRun {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrapeRun {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            history: vec![ScrapeState::Idle],
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> ScrapeState {
        // history always starts with Idle
        self.history.last().copied().unwrap_or(ScrapeState::Idle)
    }

    pub fn history(&self) -> &[ScrapeState] {
        &self.history
    }

    fn advance(&mut self, next: ScrapeState) {
        tracing::info!(from = ?self.state(), to = ?next, "Scrape state transition");
        self.history.push(next);
    }

    fn fail(&mut self, err: &ScrapeError) {
        tracing::error!("Scrape failed: {err}");
        self.advance(ScrapeState::Failed(err.kind()));
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeSummary {
    pub run_id: Uuid,
    pub site: String,
    pub search_text: String,
    pub accepted: usize,
    pub delivered_to: String,
}

pub struct Orchestrator {
    connector: Arc<dyn BrowserConnector>,
    sink: Arc<dyn ResultSink>,
    registry: SiteRegistry,
    config: ScrapeConfig,
}

impl Orchestrator {
    pub fn new(
        connector: Arc<dyn BrowserConnector>,
        sink: Arc<dyn ResultSink>,
        registry: SiteRegistry,
        config: ScrapeConfig,
    ) -> Self {
        Self {
            connector,
            sink,
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &SiteRegistry {
        &self.registry
    }

    /// Run one scrape end to end.
    pub async fn run(&self, request: &ScrapeRequest) -> Result<ScrapeSummary, ScrapeError> {
        let mut run = ScrapeRun::new();
        self.run_tracked(&mut run, request).await
    }

    /// Run one scrape, recording state transitions in `run`.
    pub async fn run_tracked(
        &self,
        run: &mut ScrapeRun,
        request: &ScrapeRequest,
    ) -> Result<ScrapeSummary, ScrapeError> {
        let span = tracing::info_span!("scrape", run_id = %run.id(), site = %request.site);
        async move {
            tracing::info!("Searching for {:?} on {}", request.search_text, request.site);

            let Some(entry) = self.registry.lookup(&request.site) else {
                let err = ScrapeError::UnsupportedSite(request.site.clone());
                run.fail(&err);
                return Err(err);
            };

            run.advance(ScrapeState::Connecting);
            let session = match self.connector.connect(&self.config.browser_endpoint).await {
                Ok(session) => session,
                Err(e) => {
                    let err = ScrapeError::Connection(format!("{e:#}"));
                    run.fail(&err);
                    return Err(err);
                }
            };

            let outcome = self.drive(run, session.as_ref(), entry, request).await;

            if let Err(e) = session.close().await {
                tracing::warn!("Failed to close browser session: {e:#}");
            }

            match outcome {
                Ok(accepted) => {
                    run.advance(ScrapeState::Done);
                    Ok(ScrapeSummary {
                        run_id: run.id(),
                        site: entry.site.clone(),
                        search_text: request.search_text.clone(),
                        accepted,
                        delivered_to: request.callback.clone(),
                    })
                }
                Err(err) => {
                    run.fail(&err);
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Everything that happens while the session is open. Returns the
    /// number of delivered products.
    async fn drive(
        &self,
        run: &mut ScrapeRun,
        session: &dyn BrowserSession,
        entry: &SiteEntry,
        request: &ScrapeRequest,
    ) -> Result<usize, ScrapeError> {
        let url = request.site.trim();
        let navigation_failed = |e: anyhow::Error| ScrapeError::Navigation {
            url: url.to_string(),
            reason: format!("{e:#}"),
        };

        let page = session.new_page().await.map_err(navigation_failed)?;
        match tokio::time::timeout(self.config.navigation_timeout, page.goto(url)).await {
            Ok(result) => result.map_err(navigation_failed)?,
            Err(_) => {
                return Err(ScrapeError::NavigationTimeout {
                    url: url.to_string(),
                    waited: self.config.navigation_timeout,
                })
            }
        }
        run.advance(ScrapeState::Navigated);

        run.advance(ScrapeState::Searching);
        SearchDriver::new(self.config.wait_timeout)
            .search(&entry.profile, page.as_ref(), &request.search_text)
            .await?;

        run.advance(ScrapeState::Collecting);
        let products = collect(
            page.as_ref(),
            &request.query(),
            &entry.profile.product_container_selector,
            entry.extractor.as_ref(),
        )
        .await?;

        run.advance(ScrapeState::Delivering);
        let batch = ResultBatch {
            data: products,
            search_text: request.search_text.clone(),
            source: request.site.clone(),
        };
        self.sink
            .deliver(&request.callback, &batch)
            .await
            .map_err(|e| ScrapeError::Delivery(format!("{e:#}")))?;

        Ok(batch.data.len())
    }
}
