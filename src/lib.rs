//! Book Catalog: a scraped book listing served over a REST API
//!
//! This crate scrapes a paginated, category-organized book listing site,
//! exports the records to CSV, bulk-loads them into SQLite and serves
//! search, filtering and aggregate statistics over HTTP.

pub mod api;
pub mod config;
pub mod export;
pub mod loader;
pub mod output;
pub mod scrape;
pub mod storage;

use thiserror::Error;

/// Main error type for catalog operations
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to fetch landing page {url}: {reason}")]
    LandingPage { url: String, reason: String },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Scrape collected no books; export left unchanged")]
    EmptyScrape,

    #[error("Export file not found: {0}")]
    ExportNotFound(String),

    #[error("Export has no rows: {0}")]
    EmptyExport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use loader::{load_export, LoadReport};
pub use storage::{BookRecord, BookStore, NewBook, SqliteStorage};
