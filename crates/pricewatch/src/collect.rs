//! Concurrent collector: extract every product container on a results
//! page and keep the relevant, trackable ones.
//!
//! All extractions run concurrently on the calling task and are joined
//! before returning. The first extraction error drops the remaining
//! in-flight extractions and fails the whole collection; there is no
//! partial result.

use crate::browser::{ElementHandle, PageHandle};
use crate::error::ScrapeError;
use crate::extract::ProductExtractor;
use crate::types::{ExtractedProduct, ScrapeResult, SearchQuery};
use futures::stream::{FuturesUnordered, TryStreamExt};

/// Why a product was left out of the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingPrice,
    MissingUrl,
    Irrelevant,
}

/// Decide whether an extracted product belongs in the result.
pub fn screen(product: &ExtractedProduct, query: &SearchQuery) -> Result<(), Rejection> {
    if product.price.is_none() {
        return Err(Rejection::MissingPrice);
    }
    if product.url.is_none() {
        return Err(Rejection::MissingUrl);
    }
    if !query.matches(product.name.as_deref()) {
        return Err(Rejection::Irrelevant);
    }
    Ok(())
}

/// Extract and filter every container matching `container_selector`.
///
/// The container query is a single snapshot of the page; callers must
/// have waited for the results to load. Output order follows completion
/// order and is not stable.
pub async fn collect(
    page: &dyn PageHandle,
    query: &SearchQuery,
    container_selector: &str,
    extractor: &dyn ProductExtractor,
) -> Result<ScrapeResult, ScrapeError> {
    tracing::info!("Retrieving products");
    let containers = page
        .query_all(container_selector)
        .await
        .map_err(|e| ScrapeError::TaskGroup(format!("listing {container_selector}: {e:#}")))?;
    tracing::info!("Found {} product containers", containers.len());

    let mut tasks: FuturesUnordered<_> = containers
        .iter()
        .enumerate()
        .map(|(index, container)| extract_one(index, container.as_ref(), query, extractor))
        .collect();

    let mut accepted = Vec::new();
    while let Some(outcome) = tasks
        .try_next()
        .await
        .map_err(|e| ScrapeError::TaskGroup(format!("{e:#}")))?
    {
        if let Some(product) = outcome {
            accepted.push(product);
        }
    }

    tracing::info!(
        "Accepted {} of {} products",
        accepted.len(),
        containers.len()
    );
    Ok(accepted)
}

async fn extract_one(
    index: usize,
    container: &dyn ElementHandle,
    query: &SearchQuery,
    extractor: &dyn ProductExtractor,
) -> anyhow::Result<Option<ExtractedProduct>> {
    let product = extractor.extract(container).await?;
    match screen(&product, query) {
        Ok(()) => Ok(Some(product)),
        Err(reason) => {
            tracing::debug!(index, ?reason, name = ?product.name, "Discarding product");
            Ok(None)
        }
    }
}
