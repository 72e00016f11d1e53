//! Scrape orchestration
//!
//! Walks the category list once, collects each category in turn and writes
//! the combined export.

use crate::config::Config;
use crate::export::write_export;
use crate::scrape::categories::discover_categories;
use crate::scrape::collector::collect_category;
use crate::scrape::fetcher::build_http_client;
use crate::storage::NewBook;
use crate::CatalogError;
use reqwest::Client;
use std::path::Path;
use url::Url;

/// Books gathered from a single category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub name: String,
    pub books: usize,
}

/// Summary of a finished scrape
#[derive(Debug, Clone, Default)]
pub struct ScrapeReport {
    /// Total books written to the export
    pub total_books: usize,
    /// Per-category counts in walk order
    pub categories: Vec<CategoryCount>,
    pub pages_fetched: u32,
    pub listings_skipped: usize,
}

/// Scrapes every category under `base_url`
///
/// Categories are walked sequentially in sidebar order and their books are
/// concatenated in that order.
pub async fn scrape_catalog(
    client: &Client,
    config: &Config,
) -> Result<(Vec<NewBook>, ScrapeReport), CatalogError> {
    let base_url = Url::parse(&config.scraper.base_url)?;
    let categories = discover_categories(client, &base_url).await?;

    let mut books = Vec::new();
    let mut report = ScrapeReport::default();

    for (index, category) in categories.iter().enumerate() {
        tracing::info!(
            "Scraping category {}/{}: {}",
            index + 1,
            categories.len(),
            category.name
        );

        let collection = collect_category(client, category, &config.scraper).await;

        report.pages_fetched += collection.pages_fetched;
        report.listings_skipped += collection.listings_skipped;
        report.categories.push(CategoryCount {
            name: category.name.clone(),
            books: collection.books.len(),
        });
        books.extend(collection.books);
    }

    report.total_books = books.len();
    Ok((books, report))
}

/// Runs a complete scrape and writes the export
///
/// The export at `config.storage.export_path` is only replaced once every
/// category has been walked, and never by an empty one.
///
/// # Returns
///
/// * `Ok(ScrapeReport)` - Scrape finished and the export was written
/// * `Err(CatalogError)` - The landing page failed, no book was collected, or the export could not be written
pub async fn run_scrape(config: &Config) -> Result<ScrapeReport, CatalogError> {
    let client = build_http_client(&config.scraper)?;
    let start_time = std::time::Instant::now();

    let (books, report) = scrape_catalog(&client, config).await?;
    if books.is_empty() {
        tracing::error!(
            "No books collected from {} categories",
            report.categories.len()
        );
        return Err(CatalogError::EmptyScrape);
    }

    write_export(Path::new(&config.storage.export_path), &books)?;

    tracing::info!(
        "Scrape complete: {} books from {} categories in {:.1}s",
        report.total_books,
        report.categories.len(),
        start_time.elapsed().as_secs_f64()
    );
    if report.listings_skipped > 0 {
        tracing::warn!("{} listings were skipped", report.listings_skipped);
    }

    Ok(report)
}
