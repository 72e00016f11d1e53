//! Category discovery from the landing page

use crate::scrape::extractor::{resolve_url, selector, ExtractError};
use crate::scrape::fetcher::{fetch_url, FetchResult};
use crate::CatalogError;
use reqwest::Client;
use scraper::Html;
use std::collections::HashSet;
use url::Url;

const CATEGORY_LINK_SELECTOR: &str = ".side_categories ul li ul li a";

/// A category to walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Display name shown in the sidebar
    pub name: String,
    /// Absolute URL of the category's first page
    pub url: Url,
}

/// Fetches the landing page and returns its categories
///
/// Failing to fetch the landing page aborts the scrape.
pub async fn discover_categories(
    client: &Client,
    base_url: &Url,
) -> Result<Vec<Category>, CatalogError> {
    tracing::info!("Fetching categories from {}", base_url);

    let body = match fetch_url(client, base_url.as_str()).await {
        FetchResult::Success { body } => body,
        failed => {
            return Err(CatalogError::LandingPage {
                url: base_url.to_string(),
                reason: failed.failure_reason().unwrap_or_default(),
            })
        }
    };

    let categories = parse_categories(&body, base_url).map_err(|e| CatalogError::LandingPage {
        url: base_url.to_string(),
        reason: e.to_string(),
    })?;

    tracing::info!("Found {} categories", categories.len());
    Ok(categories)
}

/// Extracts the ordered, URL-unique category list from landing page HTML
///
/// The first occurrence of each URL wins and sidebar order is kept.
/// Links whose href cannot be resolved are skipped.
pub fn parse_categories(html: &str, base_url: &Url) -> Result<Vec<Category>, ExtractError> {
    let document = Html::parse_document(html);
    let link_selector = selector(CATEGORY_LINK_SELECTOR)?;

    let mut seen = HashSet::new();
    let mut categories = Vec::new();

    for link in document.select(&link_selector) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };

        let url = match resolve_url(href, base_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Skipping category link: {}", e);
                continue;
            }
        };

        if !seen.insert(url.to_string()) {
            continue;
        }

        let name = link.text().collect::<String>().trim().to_string();
        categories.push(Category { name, url });
    }

    Ok(categories)
}
