//! Error taxonomy for a scrape run.
//!
//! Field-level absence on a product is never an error; it is absorbed by
//! the extractor as a `None` field. Everything here is structural and ends
//! the run.

use std::time::Duration;

/// Why a run ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    UnsupportedSite,
    ConnectionError,
    NavigationTimeout,
    NavigationError,
    SearchError,
    TaskGroupFailure,
    DeliveryError,
    ConfigError,
}

/// Errors raised by the search driver.
#[derive(thiserror::Error, Debug)]
pub enum SearchError {
    /// The site profile lacks a search field or search button selector.
    #[error("Search unsupported: site profile has no {missing} selector")]
    SearchUnsupported { missing: &'static str },

    #[error("Timed out after {waited:?} waiting for element {selector}")]
    ElementTimeout { selector: String, waited: Duration },

    #[error("Search results did not finish loading within {waited:?}")]
    LoadTimeout { waited: Duration },

    #[error("Search interaction failed: {0}")]
    Interaction(String),
}

/// All errors that can end a scrape run.
#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    #[error("Unsupported site: {0}")]
    UnsupportedSite(String),

    #[error("Could not connect to remote browser: {0}")]
    Connection(String),

    #[error("Navigation to {url} timed out after {waited:?}")]
    NavigationTimeout { url: String, waited: Duration },

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("Product extraction task failed: {0}")]
    TaskGroup(String),

    #[error("Result delivery failed: {0}")]
    Delivery(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScrapeError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ScrapeError::UnsupportedSite(_) => FailureKind::UnsupportedSite,
            ScrapeError::Connection(_) => FailureKind::ConnectionError,
            ScrapeError::NavigationTimeout { .. } => FailureKind::NavigationTimeout,
            ScrapeError::Navigation { .. } => FailureKind::NavigationError,
            ScrapeError::Search(_) => FailureKind::SearchError,
            ScrapeError::TaskGroup(_) => FailureKind::TaskGroupFailure,
            ScrapeError::Delivery(_) => FailureKind::DeliveryError,
            ScrapeError::Config(_) => FailureKind::ConfigError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_errors_classify_as_search_failures() {
        let err: ScrapeError = SearchError::SearchUnsupported {
            missing: "search button",
        }
        .into();
        assert_eq!(err.kind(), FailureKind::SearchError);
        assert!(err.to_string().contains("search button"));
    }

    #[test]
    fn test_navigation_timeout_message_names_url() {
        let err = ScrapeError::NavigationTimeout {
            url: "https://shop.test".into(),
            waited: Duration::from_secs(120),
        };
        assert_eq!(err.kind(), FailureKind::NavigationTimeout);
        assert!(err.to_string().contains("https://shop.test"));
    }
}
