//! Output module for catalog reports
//!
//! This module handles:
//! - Aggregate catalog statistics shared by the CLI and the API
//! - Printing scrape and load summaries for the command line

pub mod stats;

pub use stats::{
    load_category_stats, load_overview, print_statistics, round2, CategoryStats, StatsOverview,
};

use crate::loader::LoadReport;
use crate::scrape::ScrapeReport;

/// Prints a finished scrape to stdout
pub fn print_scrape_report(report: &ScrapeReport) {
    println!("=== Scrape Summary ===\n");
    println!("  Total books: {}", report.total_books);
    println!("  Categories: {}", report.categories.len());
    println!("  Pages fetched: {}", report.pages_fetched);
    if report.listings_skipped > 0 {
        println!("  Listings skipped: {}", report.listings_skipped);
    }
    println!();

    for category in &report.categories {
        println!("  {}: {}", category.name, category.books);
    }
}

/// Prints a finished load to stdout
pub fn print_load_report(report: &LoadReport) {
    println!("=== Load Summary ===\n");
    println!("  Rows loaded: {}", report.rows_loaded);
    println!("  Categories: {}", report.category_count);
    match report.average_price {
        Some(avg) => println!("  Average price: {:.2}", avg),
        None => println!("  Average price: N/A"),
    }

    if report.rows_skipped > 0 || report.prices_defaulted > 0 || report.blank_fields > 0 {
        println!();
        println!("Data Quality:");
        println!("  Rows skipped: {}", report.rows_skipped);
        println!("  Prices defaulted to 0.0: {}", report.prices_defaulted);
        println!("  Blank fields: {}", report.blank_fields);
    }
}
