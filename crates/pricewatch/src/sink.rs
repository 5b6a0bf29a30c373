//! Result sink: where a finished scrape hands its products.

use crate::types::ResultBatch;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Default sink base URL, the history service on its default port.
pub const DEFAULT_SINK_URL: &str = "http://localhost:5000";

/// Default bound on one delivery request.
pub const DEFAULT_SINK_TIMEOUT: Duration = Duration::from_secs(30);

/// Accepts a batch of extracted products tagged with search text and source.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn deliver(&self, callback: &str, batch: &ResultBatch) -> Result<()>;
}

/// POSTs batches as JSON to `base_url + callback`.
#[derive(Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSink {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Full endpoint for a callback path.
    pub fn endpoint(&self, callback: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            callback.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ResultSink for HttpSink {
    async fn deliver(&self, callback: &str, batch: &ResultBatch) -> Result<()> {
        let endpoint = self.endpoint(callback);
        let resp = self
            .client
            .post(&endpoint)
            .json(batch)
            .send()
            .await
            .with_context(|| format!("POST {endpoint} failed"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("POST {endpoint} returned {status}: {body}");
        }
        tracing::info!(
            "Delivered {} products to {endpoint}",
            batch.data.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_with_single_slash() {
        let sink = HttpSink::new("http://localhost:5000/", Duration::from_secs(5));
        assert_eq!(sink.endpoint("/results"), "http://localhost:5000/results");
        assert_eq!(sink.endpoint("results"), "http://localhost:5000/results");
    }
}
