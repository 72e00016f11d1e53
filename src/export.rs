//! CSV export of scraped books
//!
//! The scraper writes the export and the bulk loader reads it back. Writing
//! goes through a sibling temporary file that is renamed into place once
//! complete, so a reader never sees a partial export.

use crate::storage::NewBook;
use crate::CatalogError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Column order of the export
pub const EXPORT_HEADER: [&str; 7] = [
    "title",
    "price",
    "rating",
    "availability",
    "category",
    "image_url",
    "link",
];

/// One row as read from an export, before coercion
///
/// Every column is optional so that ragged or partially blank rows still
/// decode.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExportRow {
    pub title: Option<String>,
    pub price: Option<String>,
    pub rating: Option<String>,
    pub availability: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub link: Option<String>,
}

/// Rows read from an export
#[derive(Debug, Default)]
pub struct ExportContents {
    pub rows: Vec<ExportRow>,
    /// Rows that could not be decoded at all
    pub skipped: usize,
}

/// Writes books to `path` as CSV
///
/// The header row is always written, even for an empty slice. Missing parent
/// directories are created.
pub fn write_export(path: &Path, books: &[NewBook]) -> Result<(), CatalogError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = temp_path(path);
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&tmp_path)?;

        writer.write_record(EXPORT_HEADER)?;
        for book in books {
            writer.serialize(book)?;
        }
        writer.flush()?;
    }

    std::fs::rename(&tmp_path, path)?;
    tracing::info!("Wrote {} books to {}", books.len(), path.display());
    Ok(())
}

/// Reads an export leniently
///
/// Missing columns and short rows decode with blank fields. Rows that fail
/// to decode, such as invalid UTF-8, are counted and skipped.
pub fn read_export(path: &Path) -> Result<ExportContents, CatalogError> {
    if !path.exists() {
        return Err(CatalogError::ExportNotFound(path.display().to_string()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::None)
        .from_path(path)?;

    let mut contents = ExportContents::default();
    for (index, result) in reader.deserialize::<ExportRow>().enumerate() {
        match result {
            Ok(row) => contents.rows.push(row),
            Err(e) => {
                // index 0 is the first data row, line 2 of the file
                tracing::warn!("Skipping undecodable row {}: {}", index + 2, e);
                contents.skipped += 1;
            }
        }
    }

    Ok(contents)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn sample() -> NewBook {
        NewBook {
            title: "Tipping the Velvet".to_string(),
            price: Some(53.74),
            rating: Some("One".to_string()),
            availability: Some("In stock".to_string()),
            category: Some("Historical Fiction".to_string()),
            image_url: Some("https://books.toscrape.com/media/26/0c.jpg".to_string()),
            link: Some("https://books.toscrape.com/catalogue/tipping/index.html".to_string()),
        }
    }

    #[test]
    fn test_write_export_has_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("books.csv");

        write_export(&path, &[]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content.trim_end(),
            "title,price,rating,availability,category,image_url,link"
        );
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("books.csv");

        let mut quoted = sample();
        quoted.title = "Sharp, \"Objects\"".to_string();
        write_export(&path, &[sample(), quoted]).unwrap();

        let contents = read_export(&path).unwrap();
        assert_eq!(contents.skipped, 0);
        assert_eq!(contents.rows.len(), 2);
        assert_eq!(contents.rows[0].price.as_deref(), Some("53.74"));
        assert_eq!(contents.rows[1].title.as_deref(), Some("Sharp, \"Objects\""));
    }

    #[test]
    fn test_read_ragged_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("books.csv");
        std::fs::write(
            &path,
            "title,price,rating,availability,category,image_url,link\n\
             Short Row,12.00\n\
             Full Row,1.00,Two,In stock,Travel,img,link\n",
        )
        .unwrap();

        let contents = read_export(&path).unwrap();
        assert_eq!(contents.rows.len(), 2);
        assert_eq!(contents.rows[0].title.as_deref(), Some("Short Row"));
        assert_eq!(contents.rows[0].rating, None);
        assert_eq!(contents.rows[1].category.as_deref(), Some("Travel"));
    }

    #[test]
    fn test_read_skips_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("books.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"title,price\nGood,1.00\n\xff\xfe,2.00\nAlso Good,3.00\n")
            .unwrap();
        drop(file);

        let contents = read_export(&path).unwrap();
        assert_eq!(contents.rows.len(), 2);
        assert_eq!(contents.skipped, 1);
    }

    #[test]
    fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = read_export(&dir.path().join("absent.csv"));
        assert!(matches!(result, Err(CatalogError::ExportNotFound(_))));
    }
}
