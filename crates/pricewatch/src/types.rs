//! Core data types shared by the scrape pipeline and the history service.

use serde::{Deserialize, Serialize};

/// One product listing pulled out of a results-page container.
///
/// Every field is optional: the extractor never fails on a missing
/// sub-element, it just leaves the field empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedProduct {
    pub name: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "img")]
    pub image: Option<String>,
    pub price: Option<f64>,
}

impl ExtractedProduct {
    /// A product can only be tracked when it has both a price and a url.
    pub fn is_trackable(&self) -> bool {
        self.price.is_some() && self.url.is_some()
    }
}

/// Search text plus its lowercase whitespace-separated tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    raw: String,
    tokens: Vec<String>,
}

impl SearchQuery {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let tokens = raw
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        Self { raw, tokens }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Relevance filter: every token must appear in the lowercased name.
    ///
    /// A missing name never matches, even for a query with no tokens.
    pub fn matches(&self, name: Option<&str>) -> bool {
        let Some(name) = name else {
            return false;
        };
        let name = name.to_lowercase();
        self.tokens.iter().all(|token| name.contains(token.as_str()))
    }
}

/// One orchestrator invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    /// Site identifier, which is the site's root URL.
    pub site: String,
    pub search_text: String,
    /// Callback path on the result sink, e.g. `/results`.
    pub callback: String,
}

impl ScrapeRequest {
    pub fn new(
        site: impl Into<String>,
        search_text: impl Into<String>,
        callback: impl Into<String>,
    ) -> Self {
        Self {
            site: site.into(),
            search_text: search_text.into(),
            callback: callback.into(),
        }
    }

    pub fn query(&self) -> SearchQuery {
        SearchQuery::new(self.search_text.clone())
    }
}

/// Products accepted by the relevance filter, in completion order.
pub type ScrapeResult = Vec<ExtractedProduct>;

/// Payload handed to the result sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultBatch {
    pub data: Vec<ExtractedProduct>,
    pub search_text: String,
    pub source: String,
}
