//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the BookStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{BookSearch, BookStore, StorageError, StorageResult};
use crate::storage::{
    BookRecord, CategoryPriceStats, LoadRunRecord, LoadStatus, NewBook, RATING_VOCABULARY,
};
use crate::CatalogError;
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;

const BOOK_COLUMNS: &str = "id, title, price, rating, availability, category, image_url, link";

const INSERT_BOOK_SQL: &str = "INSERT INTO books (title, price, rating, availability, category, image_url, link)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// Missing parent directories of `path` are created.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(CatalogError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, CatalogError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Runs raw SQL against the connection
    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> rusqlite::Result<()> {
        self.conn.execute_batch(sql)
    }

    fn query_books(&self, sql: &str, values: Vec<Value>) -> StorageResult<Vec<BookRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let books = stmt
            .query_map(params_from_iter(values.iter()), book_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(books)
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl BookStore for SqliteStorage {
    // ===== Bulk Replace =====

    fn replace_all(&mut self, books: &[NewBook]) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;

        let deleted = tx.execute("DELETE FROM books", [])?;
        tracing::debug!("Cleared {} existing books", deleted);

        {
            let mut stmt = tx.prepare(INSERT_BOOK_SQL)?;
            for book in books {
                insert_with(&mut stmt, book)?;
            }
        }

        tx.commit()?;
        Ok(books.len())
    }

    fn insert_book(&mut self, book: &NewBook) -> StorageResult<BookRecord> {
        {
            let mut stmt = self.conn.prepare(INSERT_BOOK_SQL)?;
            insert_with(&mut stmt, book)?;
        }
        let id = self.conn.last_insert_rowid();

        self.get_book(id)?.ok_or(StorageError::BookNotFound(id))
    }

    fn bulk_insert(&mut self, books: &[NewBook]) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(INSERT_BOOK_SQL)?;
            for book in books {
                insert_with(&mut stmt, book)?;
            }
        }
        tx.commit()?;
        Ok(books.len())
    }

    // ===== Queries =====

    fn list_books(&self, skip: u32, limit: u32) -> StorageResult<Vec<BookRecord>> {
        let sql = format!(
            "SELECT {} FROM books ORDER BY id LIMIT ?1 OFFSET ?2",
            BOOK_COLUMNS
        );
        self.query_books(
            &sql,
            vec![Value::Integer(limit.into()), Value::Integer(skip.into())],
        )
    }

    fn get_book(&self, id: i64) -> StorageResult<Option<BookRecord>> {
        let sql = format!("SELECT {} FROM books WHERE id = ?1", BOOK_COLUMNS);
        let book = self
            .conn
            .query_row(&sql, params![id], book_from_row)
            .optional()?;
        Ok(book)
    }

    fn search_books(
        &self,
        search: &BookSearch,
        skip: u32,
        limit: u32,
    ) -> StorageResult<Vec<BookRecord>> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        if let Some(title) = &search.title {
            values.push(Value::Text(escape_like(title)));
            clauses.push(format!("title LIKE '%' || ?{} || '%' ESCAPE '\\'", values.len()));
        }

        if let Some(category) = &search.category {
            values.push(Value::Text(escape_like(category)));
            clauses.push(format!(
                "category LIKE '%' || ?{} || '%' ESCAPE '\\'",
                values.len()
            ));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        values.push(Value::Integer(limit.into()));
        let limit_idx = values.len();
        values.push(Value::Integer(skip.into()));
        let offset_idx = values.len();

        let sql = format!(
            "SELECT {} FROM books {} ORDER BY id LIMIT ?{} OFFSET ?{}",
            BOOK_COLUMNS, where_sql, limit_idx, offset_idx
        );
        self.query_books(&sql, values)
    }

    fn books_in_price_range(
        &self,
        min_price: Option<f64>,
        max_price: Option<f64>,
        skip: u32,
        limit: u32,
    ) -> StorageResult<Vec<BookRecord>> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        if let Some(min) = min_price {
            values.push(Value::Real(min));
            clauses.push(format!("price >= ?{}", values.len()));
        }

        if let Some(max) = max_price {
            values.push(Value::Real(max));
            clauses.push(format!("price <= ?{}", values.len()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        values.push(Value::Integer(limit.into()));
        let limit_idx = values.len();
        values.push(Value::Integer(skip.into()));
        let offset_idx = values.len();

        let sql = format!(
            "SELECT {} FROM books {} ORDER BY id LIMIT ?{} OFFSET ?{}",
            BOOK_COLUMNS, where_sql, limit_idx, offset_idx
        );
        self.query_books(&sql, values)
    }

    fn top_rated(&self, limit: u32) -> StorageResult<Vec<BookRecord>> {
        let sql = format!(
            "SELECT {} FROM books ORDER BY {} DESC, id ASC LIMIT ?1",
            BOOK_COLUMNS,
            rating_rank_sql()
        );
        self.query_books(&sql, vec![Value::Integer(limit.into())])
    }

    fn categories(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT category FROM books WHERE category IS NOT NULL AND category != ''",
        )?;

        let categories = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    // ===== Statistics =====

    fn count_books(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM books")
    }

    fn has_books(&self) -> StorageResult<bool> {
        let exists: i64 =
            self.conn
                .query_row("SELECT EXISTS(SELECT 1 FROM books LIMIT 1)", [], |row| {
                    row.get(0)
                })?;
        Ok(exists != 0)
    }

    fn average_price(&self) -> StorageResult<Option<f64>> {
        let avg = self
            .conn
            .query_row("SELECT AVG(price) FROM books", [], |row| row.get(0))?;
        Ok(avg)
    }

    fn average_positive_price(&self) -> StorageResult<Option<f64>> {
        let avg = self.conn.query_row(
            "SELECT AVG(price) FROM books WHERE price > 0",
            [],
            |row| row.get(0),
        )?;
        Ok(avg)
    }

    fn rating_distribution(&self) -> StorageResult<BTreeMap<String, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT rating, COUNT(*) FROM books
             WHERE rating IS NOT NULL AND rating != ''
             GROUP BY rating",
        )?;

        let mut distribution = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (rating, count) = row?;
            distribution.insert(rating, count as u64);
        }

        Ok(distribution)
    }

    fn count_categories(&self) -> StorageResult<u64> {
        self.count(
            "SELECT COUNT(DISTINCT category) FROM books WHERE category IS NOT NULL AND category != ''",
        )
    }

    fn category_price_stats(&self, category: &str) -> StorageResult<CategoryPriceStats> {
        let stats = self.conn.query_row(
            "SELECT COUNT(*), AVG(price), MIN(price), MAX(price) FROM books WHERE category = ?1",
            params![category],
            |row| {
                Ok(CategoryPriceStats {
                    book_count: row.get::<_, i64>(0)? as u64,
                    average_price: row.get(1)?,
                    min_price: row.get(2)?,
                    max_price: row.get(3)?,
                })
            },
        )?;
        Ok(stats)
    }

    fn ping(&self) -> StorageResult<()> {
        self.conn
            .query_row("SELECT 1 FROM books LIMIT 1", [], |_| Ok(()))
            .optional()?;
        Ok(())
    }

    // ===== Load Run Tracking =====

    fn create_load_run(&mut self, source_path: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO load_runs (started_at, source_path, status) VALUES (?1, ?2, ?3)",
            params![now, source_path, LoadStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn complete_load_run(
        &mut self,
        run_id: i64,
        rows_loaded: u64,
        prices_defaulted: u64,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE load_runs SET status = ?1, finished_at = ?2, rows_loaded = ?3, prices_defaulted = ?4
             WHERE id = ?5",
            params![
                LoadStatus::Completed.to_db_string(),
                now,
                rows_loaded as i64,
                prices_defaulted as i64,
                run_id
            ],
        )?;
        Ok(())
    }

    fn fail_load_run(&mut self, run_id: i64, error_message: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE load_runs SET status = ?1, finished_at = ?2, error_message = ?3 WHERE id = ?4",
            params![LoadStatus::Failed.to_db_string(), now, error_message, run_id],
        )?;
        Ok(())
    }

    fn get_load_run(&self, run_id: i64) -> StorageResult<LoadRunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, source_path, rows_loaded, prices_defaulted,
                 status, error_message
                 FROM load_runs WHERE id = ?1",
                params![run_id],
                load_run_from_row,
            )
            .optional()?
            .ok_or(StorageError::LoadRunNotFound(run_id))
    }

    fn latest_completed_load_run(&self) -> StorageResult<Option<LoadRunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, source_path, rows_loaded, prices_defaulted,
                 status, error_message
                 FROM load_runs WHERE status = ?1 ORDER BY id DESC LIMIT 1",
                params![LoadStatus::Completed.to_db_string()],
                load_run_from_row,
            )
            .optional()?;
        Ok(run)
    }
}

fn insert_with(stmt: &mut rusqlite::Statement<'_>, book: &NewBook) -> rusqlite::Result<usize> {
    stmt.execute(params![
        book.title,
        book.price,
        book.rating,
        book.availability,
        book.category,
        book.image_url,
        book.link
    ])
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<BookRecord> {
    Ok(BookRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        price: row.get(2)?,
        rating: row.get(3)?,
        availability: row.get(4)?,
        category: row.get(5)?,
        image_url: row.get(6)?,
        link: row.get(7)?,
    })
}

fn load_run_from_row(row: &Row<'_>) -> rusqlite::Result<LoadRunRecord> {
    Ok(LoadRunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        source_path: row.get(3)?,
        rows_loaded: row.get::<_, Option<i64>>(4)?.map(|n| n as u64),
        prices_defaulted: row.get::<_, Option<i64>>(5)?.map(|n| n as u64),
        status: LoadStatus::from_db_string(&row.get::<_, String>(6)?)
            .unwrap_or(LoadStatus::Failed),
        error_message: row.get(7)?,
    })
}

/// SQL expression mapping the rating word to its numeric rank
fn rating_rank_sql() -> String {
    let arms: Vec<String> = RATING_VOCABULARY
        .iter()
        .map(|(word, rank)| format!("WHEN '{}' THEN {}", word, rank))
        .collect();
    format!("(CASE rating {} ELSE 0 END)", arms.join(" "))
}

/// Escapes LIKE wildcards so user input matches literally
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
