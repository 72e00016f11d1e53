//! Scraper for the book listing site
//!
//! This module contains the scraping pipeline, including:
//! - HTTP fetching with a bounded timeout
//! - Category discovery from the landing page
//! - Paginated collection within each category
//! - Listing field extraction
//! - Overall scrape orchestration and export

mod categories;
mod collector;
mod extractor;
mod fetcher;
mod orchestrator;

pub use categories::{discover_categories, parse_categories, Category};
pub use collector::{collect_category, page_url, CategoryCollection};
pub use extractor::{extract_book, extract_page, parse_price, ExtractError, PageListings};
pub use fetcher::{build_http_client, fetch_url, FetchResult};
pub use orchestrator::{run_scrape, scrape_catalog, CategoryCount, ScrapeReport};
