//! Storage traits and error types
//!
//! This module defines the trait interface for the record store and
//! associated error types.

use crate::storage::{BookRecord, CategoryPriceStats, LoadRunRecord, NewBook};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Book not found: {0}")]
    BookNotFound(i64),

    #[error("Load run not found: {0}")]
    LoadRunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Title/category filter for substring search
#[derive(Debug, Clone, Default)]
pub struct BookSearch {
    pub title: Option<String>,
    pub category: Option<String>,
}

/// Trait for record store implementations
///
/// Reads take `&self`; anything that mutates the book table or the load
/// run log takes `&mut self`.
pub trait BookStore {
    // ===== Bulk Replace =====

    /// Replaces the entire contents of the book table
    ///
    /// Deletes every existing row and inserts `books` in one transaction.
    /// On error nothing is committed and the previous rows remain.
    ///
    /// # Returns
    ///
    /// The number of rows inserted
    fn replace_all(&mut self, books: &[NewBook]) -> StorageResult<usize>;

    /// Inserts a single book and returns it with its assigned id
    fn insert_book(&mut self, book: &NewBook) -> StorageResult<BookRecord>;

    /// Appends books without clearing existing rows
    fn bulk_insert(&mut self, books: &[NewBook]) -> StorageResult<usize>;

    // ===== Queries =====

    /// Lists books in insertion order
    fn list_books(&self, skip: u32, limit: u32) -> StorageResult<Vec<BookRecord>>;

    /// Gets a book by id
    fn get_book(&self, id: i64) -> StorageResult<Option<BookRecord>>;

    /// Case-insensitive substring search on title and/or category
    ///
    /// Both filters are ANDed when present.
    fn search_books(
        &self,
        search: &BookSearch,
        skip: u32,
        limit: u32,
    ) -> StorageResult<Vec<BookRecord>>;

    /// Books whose price lies within the inclusive bounds
    fn books_in_price_range(
        &self,
        min_price: Option<f64>,
        max_price: Option<f64>,
        skip: u32,
        limit: u32,
    ) -> StorageResult<Vec<BookRecord>>;

    /// Books ordered by ordinal rating rank, highest first
    fn top_rated(&self, limit: u32) -> StorageResult<Vec<BookRecord>>;

    /// Distinct non-empty categories
    fn categories(&self) -> StorageResult<Vec<String>>;

    // ===== Statistics =====

    /// Gets total book count
    fn count_books(&self) -> StorageResult<u64>;

    /// Returns true if at least one book exists
    fn has_books(&self) -> StorageResult<bool>;

    /// Average over all non-null prices
    fn average_price(&self) -> StorageResult<Option<f64>>;

    /// Average over prices strictly greater than zero
    fn average_positive_price(&self) -> StorageResult<Option<f64>>;

    /// Rating value -> count, excluding null and empty ratings
    fn rating_distribution(&self) -> StorageResult<BTreeMap<String, u64>>;

    /// Number of distinct non-empty categories
    fn count_categories(&self) -> StorageResult<u64>;

    /// Count and price aggregates for one category
    fn category_price_stats(&self, category: &str) -> StorageResult<CategoryPriceStats>;

    /// Cheap reachability probe
    fn ping(&self) -> StorageResult<()>;

    // ===== Load Run Tracking =====

    /// Records the start of a bulk load
    fn create_load_run(&mut self, source_path: &str) -> StorageResult<i64>;

    /// Marks a load run as completed
    fn complete_load_run(
        &mut self,
        run_id: i64,
        rows_loaded: u64,
        prices_defaulted: u64,
    ) -> StorageResult<()>;

    /// Marks a load run as failed
    fn fail_load_run(&mut self, run_id: i64, error_message: &str) -> StorageResult<()>;

    /// Gets a load run by id
    fn get_load_run(&self, run_id: i64) -> StorageResult<LoadRunRecord>;

    /// Gets the most recent successfully completed load run
    fn latest_completed_load_run(&self) -> StorageResult<Option<LoadRunRecord>>;
}
