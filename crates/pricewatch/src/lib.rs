//! Pricewatch: search a retail site through a remote browser, extract the
//! matching product listings concurrently, and hand them to a
//! price-history sink.

pub mod browser;
pub mod collect;
pub mod config;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod search;
pub mod sink;
pub mod sites;
pub mod types;

pub use collect::collect;
pub use config::ScrapeConfig;
pub use error::{FailureKind, ScrapeError, SearchError};
pub use extract::{normalize_url, parse_price, FieldSelectors, ProductExtractor, SelectorExtractor};
pub use orchestrator::{Orchestrator, ScrapeRun, ScrapeState, ScrapeSummary};
pub use search::SearchDriver;
pub use sink::{HttpSink, ResultSink};
pub use sites::{SiteProfile, SiteRegistry};
pub use types::*;
