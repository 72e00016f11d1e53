//! Storage module for persisting book records
//!
//! This module handles all database operations for the catalog, including:
//! - SQLite database initialization and schema management
//! - Transactional full replace of the book table
//! - Paginated, filtered and ranked queries
//! - Aggregate statistics
//! - Load run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{BookSearch, BookStore, StorageError, StorageResult};

use crate::CatalogError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ordinal rating words and their numeric rank
///
/// Anything outside this vocabulary ranks 0.
pub const RATING_VOCABULARY: [(&str, u8); 5] = [
    ("Five", 5),
    ("Four", 4),
    ("Three", 3),
    ("Two", 2),
    ("One", 1),
];

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(CatalogError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, CatalogError> {
    SqliteStorage::new(path)
}

/// A stored book row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: i64,
    pub title: String,
    pub price: Option<f64>,
    pub rating: Option<String>,
    pub availability: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub link: Option<String>,
}

/// A book row before the store assigns an id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub price: Option<f64>,
    pub rating: Option<String>,
    pub availability: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub link: Option<String>,
}

/// Price aggregates within one category
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryPriceStats {
    pub book_count: u64,
    pub average_price: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

/// Represents a bulk load run
#[derive(Debug, Clone)]
pub struct LoadRunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub source_path: String,
    pub rows_loaded: Option<u64>,
    pub prices_defaulted: Option<u64>,
    pub status: LoadStatus,
    pub error_message: Option<String>,
}

/// Status of a load run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Running,
    Completed,
    Failed,
}

impl LoadStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
