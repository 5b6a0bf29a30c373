//! Search driver: operate a site's search UI and wait for results.
//!
//! This is the only place user input reaches the remote page. Every wait
//! suspends the calling task until the remote browser answers, bounded by
//! the configured wait timeout.

use crate::browser::{ElementHandle, PageHandle};
use crate::error::SearchError;
use crate::sites::SiteProfile;
use std::future::Future;
use std::time::Duration;

/// Default bound on each element wait and on the post-search load wait.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct SearchDriver {
    wait_timeout: Duration,
}

impl Default for SearchDriver {
    fn default() -> Self {
        Self::new(DEFAULT_WAIT_TIMEOUT)
    }
}

impl SearchDriver {
    pub fn new(wait_timeout: Duration) -> Self {
        Self { wait_timeout }
    }

    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }

    /// Type `query_text` into the search field, press the search button and
    /// wait for the results page to load.
    ///
    /// Fails with [`SearchError::SearchUnsupported`] before touching the
    /// page if the profile lacks either search selector.
    pub async fn search<'p>(
        &self,
        profile: &SiteProfile,
        page: &'p dyn PageHandle,
        query_text: &str,
    ) -> Result<&'p dyn PageHandle, SearchError> {
        let field_selector = profile
            .search_field_selector
            .as_deref()
            .ok_or(SearchError::SearchUnsupported {
                missing: "search field",
            })?;
        let button_selector = profile
            .search_button_selector
            .as_deref()
            .ok_or(SearchError::SearchUnsupported {
                missing: "search button",
            })?;

        tracing::info!("Filling search field with {query_text:?}");
        let field = self.wait_for(page, field_selector).await?;
        field
            .type_text(query_text)
            .await
            .map_err(|e| SearchError::Interaction(format!("typing into {field_selector}: {e:#}")))?;

        tracing::info!("Pressing search button");
        let button = self.wait_for(page, button_selector).await?;
        button
            .click()
            .await
            .map_err(|e| SearchError::Interaction(format!("clicking {button_selector}: {e:#}")))?;

        self.bounded(page.wait_for_load())
            .await
            .ok_or(SearchError::LoadTimeout {
                waited: self.wait_timeout,
            })?
            .map_err(|e| SearchError::Interaction(format!("waiting for results: {e:#}")))?;

        Ok(page)
    }

    async fn wait_for(
        &self,
        page: &dyn PageHandle,
        selector: &str,
    ) -> Result<Box<dyn ElementHandle>, SearchError> {
        self.bounded(page.wait_for_selector(selector))
            .await
            .ok_or_else(|| SearchError::ElementTimeout {
                selector: selector.to_string(),
                waited: self.wait_timeout,
            })?
            .map_err(|e| SearchError::Interaction(format!("waiting for {selector}: {e:#}")))
    }

    /// `None` when the wait timeout elapses first.
    async fn bounded<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::time::timeout(self.wait_timeout, fut).await.ok()
    }
}
