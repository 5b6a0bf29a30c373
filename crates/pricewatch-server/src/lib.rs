//! Price-history service: receives scrape batches, keeps every snapshot,
//! serves per-product price history and launches scrapes for tracked
//! products.

pub mod launcher;
pub mod rest;
pub mod store;

pub use launcher::{ProcessLauncher, ScrapeLauncher};
pub use rest::{router, serve, ApiError, AppState};
pub use store::{HistoryStore, PricePoint, ProductHistory, StoreError, StoredResult, TrackedProduct};
