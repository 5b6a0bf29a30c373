//! HTTP API of the price-history service.

use crate::launcher::ScrapeLauncher;
use crate::store::{HistoryStore, StoreError};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use pricewatch::ResultBatch;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

/// Callback path handed to every scrape the service launches.
pub const RESULTS_CALLBACK: &str = "/results";

/// Site scraped for tracked products.
pub const TRACKED_SITE: &str = "https://amazon.ca";

pub struct AppState {
    pub store: Mutex<HistoryStore>,
    pub launcher: Arc<dyn ScrapeLauncher>,
}

impl AppState {
    pub fn new(store: HistoryStore, launcher: Arc<dyn ScrapeLauncher>) -> Arc<Self> {
        Arc::new(Self {
            store: Mutex::new(store),
            launcher,
        })
    }
}

/// Errors surfaced to HTTP clients as `{"message": ...}`.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(&'static str),

    #[error("Storage failure: {0}")]
    Store(#[from] StoreError),

    #[error("Could not start scraper: {0:#}")]
    Launch(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(_) | ApiError::Launch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            tracing::error!("{self}");
        }
        (self.status(), Json(json!({ "message": self.to_string() }))).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

/// Build the axum Router with all endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/results", post(submit_results).get(product_history))
        .route("/unique_search_texts", get(unique_search_texts))
        .route("/all-results", get(all_results))
        .route("/start-scraper", post(start_scraper))
        .route("/add-tracked-product", post(add_tracked_product))
        .route("/tracked-product/:id", put(toggle_tracked_product))
        .route("/tracked-products", get(tracked_products))
        .route("/update-tracked-products", post(update_tracked_products))
        .layer(cors)
        .with_state(state)
}

/// Serve the API on `addr` until the process is stopped.
pub async fn serve(addr: std::net::SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Price-history service listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ── Results ─────────────────────────────────────────────────────

async fn submit_results(
    State(state): State<Arc<AppState>>,
    Json(batch): Json<ResultBatch>,
) -> ApiResult {
    let stored = state.store.lock().await.record_batch(&batch, Utc::now())?;
    tracing::info!(
        "Stored {stored} snapshots for {:?} from {}",
        batch.search_text,
        batch.source
    );
    Ok(Json(json!({ "message": "Received data successfully" })))
}

#[derive(Deserialize)]
struct HistoryParams {
    #[serde(default)]
    search_text: String,
}

async fn product_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> ApiResult {
    let history = state.store.lock().await.history_for(&params.search_text)?;
    Ok(Json(json!(history)))
}

async fn unique_search_texts(State(state): State<Arc<AppState>>) -> ApiResult {
    let texts = state.store.lock().await.search_texts()?;
    Ok(Json(json!(texts)))
}

async fn all_results(State(state): State<Arc<AppState>>) -> ApiResult {
    let rows = state.store.lock().await.all_results()?;
    let rows: Vec<Value> = rows
        .into_iter()
        .map(|r| {
            json!({
                "name": r.name,
                "url": r.url,
                "price": r.price,
                "img": r.img,
                "date": r.created_at,
                "created_at": r.created_at,
                "search_text": r.search_text,
                "source": r.source,
            })
        })
        .collect();
    Ok(Json(Value::Array(rows)))
}

// ── Scraping ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct StartScraper {
    url: String,
    search_text: String,
}

async fn start_scraper(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartScraper>,
) -> ApiResult {
    state
        .launcher
        .launch(&req.url, &req.search_text, RESULTS_CALLBACK)
        .await
        .map_err(ApiError::Launch)?;
    Ok(Json(json!({ "message": "Scraper started successfully" })))
}

async fn update_tracked_products(State(state): State<Arc<AppState>>) -> ApiResult {
    // Release the store before launching; scrapes call back into it.
    let tracked = state.store.lock().await.tracked_products()?;

    let mut started = Vec::new();
    for product in tracked.into_iter().filter(|p| p.tracked) {
        match state
            .launcher
            .launch(TRACKED_SITE, &product.name, RESULTS_CALLBACK)
            .await
        {
            Ok(()) => started.push(product.name),
            Err(e) => tracing::warn!("Skipping tracked product {:?}: {e:#}", product.name),
        }
    }
    Ok(Json(json!({
        "message": "Scrapers started successfully",
        "products": started,
    })))
}

// ── Tracked products ────────────────────────────────────────────

#[derive(Deserialize)]
struct NewTrackedProduct {
    name: String,
}

async fn add_tracked_product(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewTrackedProduct>,
) -> ApiResult {
    let id = state.store.lock().await.add_tracked(&req.name, Utc::now())?;
    Ok(Json(json!({
        "message": "Tracked product added successfully",
        "id": id,
    })))
}

async fn toggle_tracked_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult {
    match state.store.lock().await.toggle_tracked(id)? {
        Some(_) => Ok(Json(json!({ "message": "Tracked product toggled successfully" }))),
        None => Err(ApiError::NotFound("Tracked product not found")),
    }
}

async fn tracked_products(State(state): State<Arc<AppState>>) -> ApiResult {
    let products = state.store.lock().await.tracked_products()?;
    Ok(Json(json!(products)))
}
