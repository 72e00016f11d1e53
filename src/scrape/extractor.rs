//! Listing field extraction
//!
//! Turns one `article.product_pod` listing fragment into a [`NewBook`].
//! Relative links and image sources are resolved against the URL of the
//! page the listing was found on.

use crate::storage::NewBook;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// Selector matching one listing on a category page
pub const LISTING_SELECTOR: &str = "article.product_pod";

/// Errors raised while extracting a single listing
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Listing is missing its {0}")]
    MissingElement(&'static str),

    #[error("Invalid selector: {0}")]
    InvalidSelector(&'static str),

    #[error("Cannot resolve {href} against {base}: {source}")]
    InvalidUrl {
        href: String,
        base: String,
        source: url::ParseError,
    },
}

/// Builds a selector from a static CSS expression
pub(crate) fn selector(css: &'static str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|_| ExtractError::InvalidSelector(css))
}

/// Extracts every listing on a page
///
/// Listings that fail extraction are logged and skipped.
///
/// # Returns
///
/// The extracted books, the number of listing fragments on the page and the
/// number that were skipped. A page with zero fragments marks the end of a
/// category.
pub fn extract_page(
    html: &str,
    category: &str,
    page_url: &Url,
) -> Result<PageListings, ExtractError> {
    let document = Html::parse_document(html);
    let listing_selector = selector(LISTING_SELECTOR)?;

    let mut listings = PageListings::default();
    for fragment in document.select(&listing_selector) {
        listings.fragments += 1;
        match extract_book(fragment, category, page_url) {
            Ok(book) => listings.books.push(book),
            Err(e) => {
                tracing::warn!("Skipping listing on {}: {}", page_url, e);
                listings.skipped += 1;
            }
        }
    }

    Ok(listings)
}

/// Listings extracted from a single page
#[derive(Debug, Default)]
pub struct PageListings {
    pub books: Vec<NewBook>,
    pub fragments: usize,
    pub skipped: usize,
}

/// Extracts a normalized book from one listing fragment
///
/// # Arguments
///
/// * `listing` - The `article.product_pod` element
/// * `category` - Display name of the category being walked
/// * `page_url` - URL of the page containing the listing
///
/// # Returns
///
/// * `Ok(NewBook)` - All required fields were present
/// * `Err(ExtractError)` - A required element was missing or a link could not be resolved
pub fn extract_book(
    listing: ElementRef<'_>,
    category: &str,
    page_url: &Url,
) -> Result<NewBook, ExtractError> {
    let anchor = listing
        .select(&selector("h3 a")?)
        .next()
        .ok_or(ExtractError::MissingElement("title link"))?;

    let title = anchor
        .value()
        .attr("title")
        .ok_or(ExtractError::MissingElement("title"))?
        .to_string();

    let href = anchor
        .value()
        .attr("href")
        .ok_or(ExtractError::MissingElement("link"))?;
    let link = resolve(href, page_url)?;

    // A missing price is tolerated and recorded as zero
    let price = listing
        .select(&selector(".price_color")?)
        .next()
        .map(|el| el.text().collect::<String>())
        .and_then(|text| parse_price(&text))
        .unwrap_or(0.0);

    let rating = listing
        .select(&selector("p.star-rating")?)
        .next()
        .and_then(|el| {
            el.value()
                .classes()
                .find(|class| *class != "star-rating")
                .map(str::to_string)
        })
        .ok_or(ExtractError::MissingElement("rating"))?;

    let availability = listing
        .select(&selector(".availability")?)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .ok_or(ExtractError::MissingElement("availability"))?;

    let src = listing
        .select(&selector("img")?)
        .next()
        .and_then(|el| el.value().attr("src"))
        .ok_or(ExtractError::MissingElement("image"))?;
    let image_url = resolve(src, page_url)?;

    Ok(NewBook {
        title,
        price: Some(price),
        rating: Some(rating),
        availability: Some(availability),
        category: Some(category.to_string()),
        image_url: Some(image_url),
        link: Some(link),
    })
}

/// Parses a displayed price such as `£51.77`
///
/// Currency symbols and other non-numeric characters are stripped. When both
/// `,` and `.` appear, the one that comes last is the decimal point and the
/// other is a grouping separator; a lone `,` is treated as the decimal point.
///
/// Returns None when nothing numeric remains or the result is not finite.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();

    let normalized = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), _) => cleaned.replace(',', ""),
        (None, _) => cleaned.replace(',', "."),
    };

    normalized
        .parse::<f64>()
        .ok()
        .filter(|price| price.is_finite())
}

/// Resolves an href against the page it appeared on
pub(crate) fn resolve_url(href: &str, base: &Url) -> Result<Url, ExtractError> {
    base.join(href.trim())
        .map_err(|source| ExtractError::InvalidUrl {
            href: href.to_string(),
            base: base.to_string(),
            source,
        })
}

fn resolve(href: &str, base: &Url) -> Result<String, ExtractError> {
    resolve_url(href, base).map(|url| url.to_string())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <article class="product_pod">
            <div class="image_container">
                <a href="../../../a-light-in-the-attic_1000/index.html">
                    <img src="../../../../media/cache/2c/da/2cdad67c.jpg" alt="A Light in the Attic" class="thumbnail">
                </a>
            </div>
            <p class="star-rating Three">
                <i class="icon-star"></i>
            </p>
            <h3><a href="../../../a-light-in-the-attic_1000/index.html" title="A Light in the Attic">A Light in the ...</a></h3>
            <div class="product_price">
                <p class="price_color">£51.77</p>
                <p class="instock availability">
                    <i class="icon-ok"></i>

                        In stock

                </p>
            </div>
        </article>
    "#;

    fn page_url() -> Url {
        Url::parse("https://books.toscrape.com/catalogue/category/books/poetry_23/index.html")
            .unwrap()
    }

    fn wrap(articles: &str) -> String {
        format!("<html><body><ol class=\"row\">{}</ol></body></html>", articles)
    }

    #[test]
    fn test_extract_full_listing() {
        let listings = extract_page(&wrap(LISTING), "Poetry", &page_url()).unwrap();
        assert_eq!(listings.fragments, 1);
        assert_eq!(listings.skipped, 0);

        let book = &listings.books[0];
        assert_eq!(book.title, "A Light in the Attic");
        assert_eq!(book.price, Some(51.77));
        assert_eq!(book.rating.as_deref(), Some("Three"));
        assert_eq!(book.availability.as_deref(), Some("In stock"));
        assert_eq!(book.category.as_deref(), Some("Poetry"));
        assert_eq!(
            book.link.as_deref(),
            Some("https://books.toscrape.com/catalogue/a-light-in-the-attic_1000/index.html")
        );
        assert_eq!(
            book.image_url.as_deref(),
            Some("https://books.toscrape.com/media/cache/2c/da/2cdad67c.jpg")
        );
    }

    #[test]
    fn test_missing_price_defaults_to_zero() {
        let html = wrap(&LISTING.replace(r#"<p class="price_color">£51.77</p>"#, ""));
        let listings = extract_page(&html, "Poetry", &page_url()).unwrap();
        assert_eq!(listings.books[0].price, Some(0.0));
    }

    #[test]
    fn test_missing_title_is_skipped() {
        let broken = LISTING.replace(r#"title="A Light in the Attic""#, "");
        let html = wrap(&format!("{}{}", broken, LISTING));
        let listings = extract_page(&html, "Poetry", &page_url()).unwrap();
        assert_eq!(listings.fragments, 2);
        assert_eq!(listings.skipped, 1);
        assert_eq!(listings.books.len(), 1);
    }

    #[test]
    fn test_missing_rating_is_error() {
        let html = wrap(&LISTING.replace("star-rating Three", "stars"));
        let document = Html::parse_document(&html);
        let fragment = document
            .select(&selector(LISTING_SELECTOR).unwrap())
            .next()
            .unwrap();
        let result = extract_book(fragment, "Poetry", &page_url());
        assert!(matches!(result, Err(ExtractError::MissingElement("rating"))));
    }

    #[test]
    fn test_page_without_listings() {
        let listings =
            extract_page("<html><body><p>No books</p></body></html>", "Poetry", &page_url())
                .unwrap();
        assert_eq!(listings.fragments, 0);
        assert!(listings.books.is_empty());
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("£51.77"), Some(51.77));
        assert_eq!(parse_price("Â£13.99"), Some(13.99));
        assert_eq!(parse_price("$1,234.50"), Some(1234.5));
        assert_eq!(parse_price("12,50 €"), Some(12.5));
        assert_eq!(parse_price("1.234,56 €"), Some(1234.56));
        assert_eq!(parse_price("N/A"), None);
        assert_eq!(parse_price(""), None);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("\n   In stock (22 available)\n  "), "In stock (22 available)");
    }
}
