//! Bulk loader: replaces the store contents from a CSV export
//!
//! Rows are coerced leniently. Prices that are blank, non-numeric or not
//! finite become 0.0 and every other blank field becomes an empty string.
//! The replace itself is a single transaction, so a failed load leaves the
//! previous contents in place.

use crate::export::{read_export, ExportRow};
use crate::output::stats::round2;
use crate::storage::{BookStore, NewBook};
use crate::CatalogError;
use std::path::Path;

/// Outcome of a successful load
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Rows inserted into the store
    pub rows_loaded: usize,
    /// Rows in the export that could not be decoded
    pub rows_skipped: usize,
    /// Rows whose price fell back to 0.0
    pub prices_defaulted: usize,
    /// Non-price fields that were blank and stored as empty strings
    pub blank_fields: usize,
    /// Distinct non-empty categories after the load
    pub category_count: u64,
    /// Average of prices above zero, rounded to 2 decimals
    pub average_price: Option<f64>,
}

/// Loads the export at `path` into `store`, replacing its contents
///
/// # Arguments
///
/// * `store` - The record store to replace
/// * `path` - Path to the CSV export
///
/// # Returns
///
/// * `Ok(LoadReport)` - The store now holds exactly the export's rows
/// * `Err(CatalogError)` - The export was missing, unreadable or empty, or the replace failed and was rolled back
pub fn load_export<S>(store: &mut S, path: &Path) -> Result<LoadReport, CatalogError>
where
    S: BookStore + ?Sized,
{
    let contents = read_export(path)?;
    tracing::info!(
        "Read {} rows from {}",
        contents.rows.len(),
        path.display()
    );

    let mut report = LoadReport {
        rows_skipped: contents.skipped,
        ..LoadReport::default()
    };

    let books: Vec<NewBook> = contents
        .rows
        .into_iter()
        .map(|row| coerce_row(row, &mut report))
        .collect();

    let source = path.display().to_string();
    if books.is_empty() {
        return Err(CatalogError::EmptyExport(source));
    }

    let run_id = store.create_load_run(&source)?;

    match store.replace_all(&books) {
        Ok(inserted) => {
            report.rows_loaded = inserted;
            store.complete_load_run(run_id, inserted as u64, report.prices_defaulted as u64)?;
        }
        Err(e) => {
            tracing::error!("Load from {} failed, previous data kept: {}", source, e);
            if let Err(mark_err) = store.fail_load_run(run_id, &e.to_string()) {
                tracing::warn!("Could not record failed load run {}: {}", run_id, mark_err);
            }
            return Err(e.into());
        }
    }

    report.category_count = store.count_categories()?;
    report.average_price = store.average_positive_price()?.map(round2);

    tracing::info!("Loaded {} books into the store", report.rows_loaded);
    tracing::info!("Categories: {}", report.category_count);
    match report.average_price {
        Some(avg) => tracing::info!("Average price: {:.2}", avg),
        None => tracing::info!("Average price: N/A"),
    }
    if report.prices_defaulted > 0 || report.rows_skipped > 0 {
        tracing::warn!(
            "{} prices defaulted to 0.0, {} rows skipped, {} blank fields",
            report.prices_defaulted,
            report.rows_skipped,
            report.blank_fields
        );
    }

    Ok(report)
}

/// Coerces one raw export row into an insertable book
fn coerce_row(row: ExportRow, report: &mut LoadReport) -> NewBook {
    let price = match row.price.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => raw.parse::<f64>().ok().filter(|p| p.is_finite()),
        _ => None,
    };
    if price.is_none() {
        report.prices_defaulted += 1;
    }

    let mut text = |value: Option<String>| -> String {
        match value {
            Some(v) if !v.is_empty() => v,
            _ => {
                report.blank_fields += 1;
                String::new()
            }
        }
    };

    NewBook {
        title: text(row.title),
        price: Some(price.unwrap_or(0.0)),
        rating: Some(text(row.rating)),
        availability: Some(text(row.availability)),
        category: Some(text(row.category)),
        image_url: Some(text(row.image_url)),
        link: Some(text(row.link)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::write_export;
    use crate::storage::{LoadStatus, SqliteStorage};
    use tempfile::TempDir;

    const HEADER: &str = "title,price,rating,availability,category,image_url,link\n";

    fn write_csv(dir: &TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("books.csv");
        std::fs::write(&path, format!("{}{}", HEADER, body)).unwrap();
        path
    }

    #[test]
    fn test_load_n_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "A,10.00,One,In stock,Travel,img-a,link-a\n\
             B,20.00,Two,In stock,Travel,img-b,link-b\n\
             C,30.00,Three,In stock,Poetry,img-c,link-c\n",
        );

        let mut store = SqliteStorage::open_in_memory().unwrap();
        let report = load_export(&mut store, &path).unwrap();

        assert_eq!(report.rows_loaded, 3);
        assert_eq!(report.prices_defaulted, 0);
        assert_eq!(report.blank_fields, 0);
        assert_eq!(report.category_count, 2);
        assert_eq!(report.average_price, Some(20.0));

        let books = store.list_books(0, 100).unwrap();
        let titles: Vec<_> = books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
        assert_eq!(books[2].category.as_deref(), Some("Poetry"));
    }

    #[test]
    fn test_unparseable_price_defaults_to_zero() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "A,N/A,One,In stock,Travel,img,link\n\
             B,,Two,In stock,Travel,img,link\n\
             C,inf,Two,In stock,Travel,img,link\n",
        );

        let mut store = SqliteStorage::open_in_memory().unwrap();
        let report = load_export(&mut store, &path).unwrap();

        assert_eq!(report.prices_defaulted, 3);
        assert_eq!(report.average_price, None);
        for book in store.list_books(0, 100).unwrap() {
            assert_eq!(book.price, Some(0.0));
        }
    }

    #[test]
    fn test_blank_fields_become_empty_strings() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, ",5.00,,In stock,,img,link\nShort,1.00\n");

        let mut store = SqliteStorage::open_in_memory().unwrap();
        let report = load_export(&mut store, &path).unwrap();

        // 3 blanks in row one, 5 missing columns in row two
        assert_eq!(report.blank_fields, 8);

        let books = store.list_books(0, 100).unwrap();
        assert_eq!(books[0].title, "");
        assert_eq!(books[0].rating.as_deref(), Some(""));
        assert_eq!(books[1].link.as_deref(), Some(""));
        assert_eq!(report.category_count, 0);
    }

    #[test]
    fn test_missing_file_leaves_store_untouched() {
        let dir = TempDir::new().unwrap();
        let mut store = SqliteStorage::open_in_memory().unwrap();
        store
            .bulk_insert(&[NewBook {
                title: "Existing".to_string(),
                ..NewBook::default()
            }])
            .unwrap();

        let result = load_export(&mut store, &dir.path().join("missing.csv"));

        assert!(matches!(result, Err(CatalogError::ExportNotFound(_))));
        assert_eq!(store.count_books().unwrap(), 1);
        assert!(store.latest_completed_load_run().unwrap().is_none());
    }

    #[test]
    fn test_header_only_export_leaves_store_untouched() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "");
        let mut store = SqliteStorage::open_in_memory().unwrap();
        store
            .bulk_insert(&[NewBook {
                title: "Existing".to_string(),
                ..NewBook::default()
            }])
            .unwrap();

        let result = load_export(&mut store, &path);

        assert!(matches!(result, Err(CatalogError::EmptyExport(_))));
        assert_eq!(store.count_books().unwrap(), 1);
    }

    #[test]
    fn test_load_replaces_previous_contents() {
        let dir = TempDir::new().unwrap();
        let mut store = SqliteStorage::open_in_memory().unwrap();

        let first = write_csv(&dir, "Old,1.00,One,In stock,Travel,img,link\n");
        load_export(&mut store, &first).unwrap();

        let second = write_csv(
            &dir,
            "New A,2.00,Two,In stock,Poetry,img,link\nNew B,3.00,Three,In stock,Poetry,img,link\n",
        );
        let report = load_export(&mut store, &second).unwrap();

        assert_eq!(report.rows_loaded, 2);
        let titles: Vec<_> = store
            .list_books(0, 100)
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, vec!["New A", "New B"]);
    }

    #[test]
    fn test_load_records_completed_run() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "A,N/A,One,In stock,Travel,img,link\n");

        let mut store = SqliteStorage::open_in_memory().unwrap();
        load_export(&mut store, &path).unwrap();

        let run = store.latest_completed_load_run().unwrap().unwrap();
        assert_eq!(run.status, LoadStatus::Completed);
        assert_eq!(run.rows_loaded, Some(1));
        assert_eq!(run.prices_defaulted, Some(1));
        assert_eq!(run.source_path, path.display().to_string());
    }

    #[test]
    fn test_failed_replace_keeps_previous_rows() {
        let dir = TempDir::new().unwrap();
        let mut store = SqliteStorage::open_in_memory().unwrap();
        let first = write_csv(&dir, "Keep,1.00,One,In stock,Travel,img,link\n");
        load_export(&mut store, &first).unwrap();

        store
            .execute_raw(
                "CREATE TRIGGER reject_all BEFORE INSERT ON books
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let second = write_csv(&dir, "Lost,2.00,Two,In stock,Travel,img,link\n");
        let result = load_export(&mut store, &second);

        assert!(result.is_err());
        let books = store.list_books(0, 100).unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Keep");
        let latest = store.latest_completed_load_run().unwrap().unwrap();
        assert_eq!(latest.source_path, first.display().to_string());
    }

    #[test]
    fn test_export_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("books.csv");
        let originals = vec![
            NewBook {
                title: "It's Only the Himalayas, \"really\"".to_string(),
                price: Some(45.17),
                rating: Some("Two".to_string()),
                availability: Some("In stock".to_string()),
                category: Some("Travel".to_string()),
                image_url: Some("https://books.toscrape.com/media/cache/27/a5.jpg".to_string()),
                link: Some("https://books.toscrape.com/catalogue/its-only_981/index.html".to_string()),
            },
            NewBook {
                title: "Ünïcödé Tïtle".to_string(),
                price: Some(0.1 + 0.2),
                rating: Some("Five".to_string()),
                availability: Some("In stock".to_string()),
                category: Some("Poetry".to_string()),
                image_url: Some("https://books.toscrape.com/media/x.jpg".to_string()),
                link: Some("https://books.toscrape.com/catalogue/x/index.html".to_string()),
            },
        ];

        write_export(&path, &originals).unwrap();
        let mut store = SqliteStorage::open_in_memory().unwrap();
        load_export(&mut store, &path).unwrap();

        let loaded = store.list_books(0, 100).unwrap();
        assert_eq!(loaded.len(), originals.len());
        for (original, stored) in originals.iter().zip(&loaded) {
            assert_eq!(stored.title, original.title);
            assert_eq!(stored.rating, original.rating);
            assert_eq!(stored.availability, original.availability);
            assert_eq!(stored.category, original.category);
            assert_eq!(stored.image_url, original.image_url);
            assert_eq!(stored.link, original.link);
            let diff = (stored.price.unwrap() - original.price.unwrap()).abs();
            assert!(diff < 1e-9);
        }
    }
}
