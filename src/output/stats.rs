//! Statistics generation from the record store
//!
//! This module provides functionality for extracting and displaying
//! catalog statistics from the storage layer. The same structures are
//! served by the stats endpoints.

use crate::storage::BookStore;
use crate::CatalogError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Catalog-wide statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsOverview {
    /// Total number of stored books
    pub total_books: u64,

    /// Average over all prices, rounded to 2 decimals; absent when every price is 0
    pub average_price: Option<f64>,

    /// Rating word -> number of books, excluding blank ratings
    pub rating_distribution: BTreeMap<String, u64>,

    /// Number of distinct non-empty categories
    pub categories_count: u64,
}

/// Price statistics for one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub category: String,
    pub book_count: u64,
    /// Rounded to 2 decimals
    pub average_price: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

/// Rounds to 2 decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rounded average, absent when nothing carried a real price
fn priced_average(average: Option<f64>) -> Option<f64> {
    average.filter(|avg| *avg != 0.0).map(round2)
}

/// Loads the overview statistics from storage
///
/// # Arguments
///
/// * `store` - The storage backend to query
///
/// # Returns
///
/// * `Ok(StatsOverview)` - Successfully loaded statistics
/// * `Err(CatalogError)` - Failed to query statistics
pub fn load_overview(store: &dyn BookStore) -> Result<StatsOverview, CatalogError> {
    Ok(StatsOverview {
        total_books: store.count_books()?,
        average_price: priced_average(store.average_price()?),
        rating_distribution: store.rating_distribution()?,
        categories_count: store.count_categories()?,
    })
}

/// Loads per-category statistics, one query per category
pub fn load_category_stats(store: &dyn BookStore) -> Result<Vec<CategoryStats>, CatalogError> {
    let categories = store.categories()?;
    let mut stats = Vec::with_capacity(categories.len());

    for category in categories {
        let prices = store.category_price_stats(&category)?;
        stats.push(CategoryStats {
            category,
            book_count: prices.book_count,
            average_price: priced_average(prices.average_price),
            min_price: prices.min_price,
            max_price: prices.max_price,
        });
    }

    Ok(stats)
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `overview` - Catalog-wide statistics
/// * `categories` - Per-category statistics
pub fn print_statistics(overview: &StatsOverview, categories: &[CategoryStats]) {
    println!("=== Catalog Statistics ===\n");

    println!("Overview:");
    println!("  Total books: {}", overview.total_books);
    match overview.average_price {
        Some(avg) => println!("  Average price: {:.2}", avg),
        None => println!("  Average price: N/A"),
    }
    println!("  Categories: {}", overview.categories_count);
    println!();

    if !overview.rating_distribution.is_empty() {
        println!("Books by Rating:");
        // Sort ratings by count (descending)
        let mut rating_counts: Vec<_> = overview.rating_distribution.iter().collect();
        rating_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (rating, count) in rating_counts {
            let percentage = if overview.total_books > 0 {
                (*count as f64 / overview.total_books as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", rating, count, percentage);
        }
        println!();
    }

    if !categories.is_empty() {
        println!("Categories ({}):", categories.len());
        for stats in categories {
            println!(
                "  {}: {} books, avg {}, min {}, max {}",
                stats.category,
                stats.book_count,
                format_price(stats.average_price),
                format_price(stats.min_price),
                format_price(stats.max_price)
            );
        }
    }
}

fn format_price(price: Option<f64>) -> String {
    price
        .map(|p| format!("{:.2}", p))
        .unwrap_or_else(|| "N/A".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{BookStore, NewBook, SqliteStorage};

    fn priced(title: &str, price: f64, category: &str, rating: &str) -> NewBook {
        NewBook {
            title: title.to_string(),
            price: Some(price),
            rating: Some(rating.to_string()),
            category: Some(category.to_string()),
            ..NewBook::default()
        }
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(51.532), 51.53);
        assert_eq!(round2(20.0), 20.0);
        assert_eq!(round2(13.335_1), 13.34);
    }

    #[test]
    fn test_overview() {
        let mut store = SqliteStorage::open_in_memory().unwrap();
        store
            .replace_all(&[
                priced("a", 10.0, "Travel", "One"),
                priced("b", 10.0, "Travel", "One"),
                priced("c", 13.333, "Poetry", "Five"),
                priced("d", 0.0, "", ""),
            ])
            .unwrap();

        let overview = load_overview(&store).unwrap();
        assert_eq!(overview.total_books, 4);
        assert_eq!(overview.average_price, Some(8.33));
        assert_eq!(overview.categories_count, 2);
        assert_eq!(overview.rating_distribution.len(), 2);
        assert_eq!(overview.rating_distribution["One"], 2);
    }

    #[test]
    fn test_overview_empty_store() {
        let store = SqliteStorage::open_in_memory().unwrap();
        let overview = load_overview(&store).unwrap();
        assert_eq!(overview.total_books, 0);
        assert_eq!(overview.average_price, None);
        assert!(overview.rating_distribution.is_empty());
        assert_eq!(overview.categories_count, 0);
    }

    #[test]
    fn test_category_stats() {
        let mut store = SqliteStorage::open_in_memory().unwrap();
        store
            .replace_all(&[
                priced("a", 10.0, "Travel", "One"),
                priced("b", 20.0, "Travel", "Two"),
                priced("c", 30.0, "Travel", "Three"),
                priced("d", 5.0, "Poetry", "Four"),
                priced("e", 6.25, "Poetry", "Four"),
            ])
            .unwrap();

        let stats = load_category_stats(&store).unwrap();
        assert_eq!(stats.len(), 2);

        let travel = stats.iter().find(|s| s.category == "Travel").unwrap();
        assert_eq!(travel.book_count, 3);
        assert_eq!(travel.average_price, Some(20.0));
        assert_eq!(travel.min_price, Some(10.0));
        assert_eq!(travel.max_price, Some(30.0));

        let poetry = stats.iter().find(|s| s.category == "Poetry").unwrap();
        assert_eq!(poetry.book_count, 2);
        assert_eq!(poetry.average_price, Some(5.63));
        assert_eq!(poetry.min_price, Some(5.0));
    }

    #[test]
    fn test_average_absent_when_every_price_defaulted() {
        let dir = tempfile::TempDir::new().unwrap();
        let csv = dir.path().join("books.csv");
        std::fs::write(
            &csv,
            "title,price,rating,availability,category,image_url,link\n\
             a,N/A,One,In stock,Travel,,\n\
             b,,Two,In stock,Travel,,\n",
        )
        .unwrap();

        let mut store = SqliteStorage::open_in_memory().unwrap();
        crate::load_export(&mut store, &csv).unwrap();

        let overview = load_overview(&store).unwrap();
        assert_eq!(overview.total_books, 2);
        assert_eq!(overview.average_price, None);

        let stats = load_category_stats(&store).unwrap();
        assert_eq!(stats[0].book_count, 2);
        assert_eq!(stats[0].average_price, None);
        assert_eq!(stats[0].min_price, Some(0.0));
    }
}
