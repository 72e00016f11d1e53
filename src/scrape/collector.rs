//! Paginated collection of one category's listings
//!
//! Page 1 is the category URL itself; page n is `page-{n}.html` resolved
//! against it. The walk ends at the first page that fails to fetch, the
//! first page with no listings, or the configured page cap.

use crate::config::ScraperConfig;
use crate::scrape::categories::Category;
use crate::scrape::extractor::extract_page;
use crate::scrape::fetcher::{fetch_url, FetchResult};
use crate::storage::NewBook;
use reqwest::Client;
use url::Url;

/// Everything gathered from one category
#[derive(Debug, Default)]
pub struct CategoryCollection {
    pub books: Vec<NewBook>,
    pub pages_fetched: u32,
    pub listings_skipped: usize,
}

/// Returns the URL of the given 1-based page within a category
pub fn page_url(category_url: &Url, page: u32) -> Result<Url, url::ParseError> {
    if page <= 1 {
        Ok(category_url.clone())
    } else {
        category_url.join(&format!("page-{}.html", page))
    }
}

/// Walks every page of a category, collecting its books in page order
///
/// Fetch failures end the category with a warning and keep what was
/// already collected; they are never retried.
pub async fn collect_category(
    client: &Client,
    category: &Category,
    config: &ScraperConfig,
) -> CategoryCollection {
    let mut collection = CategoryCollection::default();
    let delay = config.page_delay();

    for page in 1..=config.max_pages_per_category {
        let url = match page_url(&category.url, page) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Cannot build page {} URL for {}: {}", page, category.name, e);
                break;
            }
        };

        tracing::debug!("Fetching {} page {}: {}", category.name, page, url);
        collection.pages_fetched += 1;

        let body = match fetch_url(client, url.as_str()).await {
            FetchResult::Success { body } => body,
            failed => {
                tracing::warn!(
                    "Stopping category {} at page {}: {}",
                    category.name,
                    page,
                    failed.failure_reason().unwrap_or_default()
                );
                break;
            }
        };

        let listings = match extract_page(&body, &category.name, &url) {
            Ok(listings) => listings,
            Err(e) => {
                tracing::warn!("Stopping category {} at page {}: {}", category.name, page, e);
                break;
            }
        };

        if listings.fragments == 0 {
            tracing::debug!("No listings on page {} of {}", page, category.name);
            break;
        }

        collection.listings_skipped += listings.skipped;
        collection.books.extend(listings.books);

        if page == config.max_pages_per_category {
            tracing::warn!(
                "Reached page cap of {} for category {}",
                config.max_pages_per_category,
                category.name
            );
            break;
        }

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    tracing::info!(
        "Collected {} books from {} ({} pages)",
        collection.books.len(),
        category.name,
        collection.pages_fetched
    );

    collection
}
