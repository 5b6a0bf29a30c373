//! Price-history store backed by SQLite.
//!
//! Every delivered product becomes one snapshot row; nothing is ever
//! updated in place, so the rows for one product URL form its price
//! history.

use chrono::{DateTime, SecondsFormat, Utc};
use pricewatch::ResultBatch;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt timestamp '{value}' in {table}")]
    Timestamp { table: &'static str, value: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One stored snapshot of a product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredResult {
    pub id: i64,
    pub name: Option<String>,
    pub img: Option<String>,
    pub url: Option<String>,
    pub price: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub search_text: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub price: Option<f64>,
    pub date: DateTime<Utc>,
}

/// All snapshots of one product URL for a search text, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductHistory {
    pub name: Option<String>,
    pub url: Option<String>,
    pub img: Option<String>,
    pub source: String,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "priceHistory")]
    pub price_history: Vec<PricePoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedProduct {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub tracked: bool,
}

pub struct HistoryStore {
    db: Connection,
}

impl HistoryStore {
    /// Open or create a store at `path`.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    /// A throwaway store that lives as long as the value.
    pub fn in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Default location, `~/.pricewatch/history.db`.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".pricewatch")
            .join("history.db")
    }

    fn init(db: Connection) -> StoreResult<Self> {
        db.execute_batch(
            "CREATE TABLE IF NOT EXISTS product_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT,
                img TEXT,
                url TEXT,
                price REAL,
                created_at TEXT NOT NULL,
                search_text TEXT NOT NULL,
                source TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_product_results_search
                ON product_results (search_text, created_at);
            CREATE TABLE IF NOT EXISTS tracked_products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                tracked INTEGER NOT NULL DEFAULT 1
            );",
        )?;
        Ok(Self { db })
    }

    /// Append one snapshot row per product in the batch. Returns the
    /// number of rows written.
    pub fn record_batch(&mut self, batch: &ResultBatch, at: DateTime<Utc>) -> StoreResult<usize> {
        let created_at = encode_time(at);
        let tx = self.db.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO product_results
                     (name, img, url, price, created_at, search_text, source)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for product in &batch.data {
                stmt.execute(params![
                    product.name,
                    product.image,
                    product.url,
                    product.price,
                    created_at,
                    batch.search_text,
                    batch.source,
                ])?;
            }
        }
        tx.commit()?;
        Ok(batch.data.len())
    }

    /// Every snapshot, in insertion order.
    pub fn all_results(&self) -> StoreResult<Vec<StoredResult>> {
        let mut stmt = self.db.prepare(
            "SELECT id, name, img, url, price, created_at, search_text, source
             FROM product_results ORDER BY id",
        )?;
        let rows = stmt.query_map([], raw_result)?;
        rows.map(|row| row?.decode()).collect()
    }

    /// Snapshots for `search_text` grouped by product URL. Groups appear
    /// in order of their newest snapshot; each history is newest first.
    pub fn history_for(&self, search_text: &str) -> StoreResult<Vec<ProductHistory>> {
        let mut stmt = self.db.prepare(
            "SELECT id, name, img, url, price, created_at, search_text, source
             FROM product_results WHERE search_text = ?1
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![search_text], raw_result)?;

        let mut groups: Vec<ProductHistory> = Vec::new();
        for row in rows {
            let result = row?.decode()?;
            let point = PricePoint {
                price: result.price,
                date: result.created_at,
            };
            match groups.iter_mut().find(|g| g.url == result.url) {
                Some(group) => group.price_history.push(point),
                None => groups.push(ProductHistory {
                    name: result.name,
                    url: result.url,
                    img: result.img,
                    source: result.source,
                    created_at: result.created_at,
                    price_history: vec![point],
                }),
            }
        }
        Ok(groups)
    }

    /// Distinct search texts, in order of first appearance.
    pub fn search_texts(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self.db.prepare(
            "SELECT search_text FROM product_results GROUP BY search_text ORDER BY MIN(id)",
        )?;
        let texts = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(texts)
    }

    pub fn add_tracked(&mut self, name: &str, at: DateTime<Utc>) -> StoreResult<i64> {
        self.db.execute(
            "INSERT INTO tracked_products (name, created_at, tracked) VALUES (?1, ?2, 1)",
            params![name, encode_time(at)],
        )?;
        Ok(self.db.last_insert_rowid())
    }

    /// Flip the tracked flag. Returns the new value, or `None` when no
    /// product has that id.
    pub fn toggle_tracked(&mut self, id: i64) -> StoreResult<Option<bool>> {
        let tx = self.db.transaction()?;
        let current: Option<bool> = tx
            .query_row(
                "SELECT tracked FROM tracked_products WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(current) = current else {
            return Ok(None);
        };
        tx.execute(
            "UPDATE tracked_products SET tracked = ?1 WHERE id = ?2",
            params![!current, id],
        )?;
        tx.commit()?;
        Ok(Some(!current))
    }

    pub fn tracked_products(&self) -> StoreResult<Vec<TrackedProduct>> {
        let mut stmt = self
            .db
            .prepare("SELECT id, name, created_at, tracked FROM tracked_products ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, bool>(3)?,
            ))
        })?;
        rows.map(|row| {
            let (id, name, created_at, tracked) = row?;
            Ok(TrackedProduct {
                id,
                name,
                created_at: decode_time("tracked_products", created_at)?,
                tracked,
            })
        })
        .collect()
    }
}

/// A product_results row before its timestamp is decoded.
struct RawResult {
    id: i64,
    name: Option<String>,
    img: Option<String>,
    url: Option<String>,
    price: Option<f64>,
    created_at: String,
    search_text: String,
    source: String,
}

impl RawResult {
    fn decode(self) -> StoreResult<StoredResult> {
        Ok(StoredResult {
            id: self.id,
            name: self.name,
            img: self.img,
            url: self.url,
            price: self.price,
            created_at: decode_time("product_results", self.created_at)?,
            search_text: self.search_text,
            source: self.source,
        })
    }
}

fn raw_result(row: &Row<'_>) -> rusqlite::Result<RawResult> {
    Ok(RawResult {
        id: row.get(0)?,
        name: row.get(1)?,
        img: row.get(2)?,
        url: row.get(3)?,
        price: row.get(4)?,
        created_at: row.get(5)?,
        search_text: row.get(6)?,
        source: row.get(7)?,
    })
}

// Fixed-width UTC so lexical order in SQL matches time order.
fn encode_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_time(table: &'static str, value: String) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| StoreError::Timestamp { table, value })
}
