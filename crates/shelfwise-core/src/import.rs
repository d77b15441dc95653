//! Goodreads CSV import
//!
//! Maps a Goodreads library export onto books. Column mapping:
//!
//! | CSV column           | Book field                                |
//! |----------------------|-------------------------------------------|
//! | `Title`              | `title` (required, row skipped if empty)  |
//! | `Author`             | `author`, "Last, First" reordered         |
//! | `Exclusive Shelf`    | `status` (read/currently-reading/to-read) |
//! | `My Rating`          | `rating`                                  |
//! | `Bookshelves`        | `tags` (minus the three status shelves)   |
//! | `Date Read`          | `date_read`                               |
//! | `Number of Pages`    | `pages`                                   |
//! | `My Review`          | `notes`                                   |
//!
//! Rows whose title already exists (case-insensitive, against the library
//! or an earlier row of the same file) are skipped. Rows that fail to
//! parse are skipped individually; only an unreadable file aborts.

use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{Book, ReadingStatus};

/// Errors aborting an entire import
#[derive(Error, Debug)]
pub enum ParseError {
    /// The file could not be read as CSV at all
    #[error("Not a readable CSV file: {0}")]
    Malformed(String),

    /// The header row is missing the required columns
    #[error("Missing required column '{0}'")]
    MissingColumn(String),
}

/// Outcome of one import run
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    /// Books to be saved
    pub books: Vec<Book>,
    /// Rows skipped because the title already exists
    pub skipped_duplicates: usize,
    /// Rows skipped because they were malformed or missing a title
    pub skipped_invalid: usize,
}

/// The Goodreads shelves that map to a status rather than a tag
const STATUS_SHELVES: [&str; 3] = ["read", "currently-reading", "to-read"];

/// Parse a Goodreads CSV export into importable books
///
/// `existing_titles` is the current library's titles; matches are skipped.
pub fn import_goodreads_csv(csv_text: &str, existing: &[Book]) -> Result<ImportReport, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ParseError::Malformed(e.to_string()))?
        .clone();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let title_idx = column("Title").ok_or_else(|| ParseError::MissingColumn("Title".into()))?;
    let author_idx = column("Author");
    let shelf_idx = column("Exclusive Shelf");
    let rating_idx = column("My Rating");
    let shelves_idx = column("Bookshelves").or_else(|| column("Bookshelves with positions"));
    let date_read_idx = column("Date Read");
    let pages_idx = column("Number of Pages");
    let review_idx = column("My Review");

    let mut seen: HashSet<String> = existing.iter().map(|b| b.title.to_lowercase()).collect();
    let mut report = ImportReport::default();

    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                warn!("Skipping unparseable CSV row: {}", err);
                report.skipped_invalid += 1;
                continue;
            }
        };
        let field = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("").trim();

        let title = field(Some(title_idx));
        if title.is_empty() {
            report.skipped_invalid += 1;
            continue;
        }
        if !seen.insert(title.to_lowercase()) {
            debug!("Skipping duplicate title '{}'", title);
            report.skipped_duplicates += 1;
            continue;
        }

        let mut book = Book::new(title);
        book.set_author(normalize_author(field(author_idx)));
        book.status = match field(shelf_idx).to_lowercase().as_str() {
            "read" => ReadingStatus::Read,
            "currently-reading" => ReadingStatus::Reading,
            _ => ReadingStatus::Want,
        };
        book.rating = field(rating_idx).parse::<u8>().unwrap_or(0).min(5);
        book.date_read = field(date_read_idx).to_string();
        book.pages = field(pages_idx).parse().unwrap_or(0);
        book.notes = field(review_idx).to_string();
        // Non-status shelves become tags
        book.set_tags(
            field(shelves_idx)
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty() && !STATUS_SHELVES.contains(&s.to_lowercase().as_str()))
                .map(String::from)
                .collect(),
        );

        report.books.push(book);
    }

    Ok(report)
}

/// Reorder a "Last, First" author name to "First Last"
///
/// Names without a comma pass through unchanged.
pub fn normalize_author(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return "Unknown".to_string();
    }
    match raw.split_once(',') {
        Some((last, first)) if !first.trim().is_empty() => {
            format!("{} {}", first.trim(), last.trim())
        }
        _ => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "Title,Author,Exclusive Shelf,My Rating,Bookshelves,Date Read,Number of Pages,My Review";

    #[test]
    fn test_import_basic_row() {
        let csv = format!(
            "{}\nDune,\"Herbert, Frank\",read,5,,2024-03-01,412,Loved it",
            HEADER
        );
        let report = import_goodreads_csv(&csv, &[]).unwrap();
        assert_eq!(report.books.len(), 1);

        let book = &report.books[0];
        assert_eq!(book.title, "Dune");
        // Last-name/first-name reorder applied
        assert_eq!(book.author, "Frank Herbert");
        assert_eq!(book.status, ReadingStatus::Read);
        assert_eq!(book.rating, 5);
        assert_eq!(book.date_read, "2024-03-01");
        assert_eq!(book.pages, 412);
        assert_eq!(book.notes, "Loved it");
    }

    #[test]
    fn test_shelf_status_mapping() {
        let csv = format!(
            "{}\nA,X,read,,,,,\nB,X,currently-reading,,,,,\nC,X,to-read,,,,,\nD,X,,,,,,",
            HEADER
        );
        let report = import_goodreads_csv(&csv, &[]).unwrap();
        let statuses: Vec<ReadingStatus> = report.books.iter().map(|b| b.status).collect();
        assert_eq!(
            statuses,
            vec![
                ReadingStatus::Read,
                ReadingStatus::Reading,
                ReadingStatus::Want,
                ReadingStatus::Want,
            ]
        );
    }

    #[test]
    fn test_non_status_shelves_become_tags() {
        let csv = format!(
            "{}\nDune,Frank Herbert,read,0,\"sci-fi, favorites, to-read\",,,",
            HEADER
        );
        let report = import_goodreads_csv(&csv, &[]).unwrap();
        assert_eq!(report.books[0].tags, vec!["sci-fi", "favorites"]);
    }

    #[test]
    fn test_duplicate_titles_skipped_case_insensitive() {
        let existing = vec![Book::new("Dune")];
        let csv = format!("{}\nDUNE,Frank Herbert,read,5,,,,\nEmma,Jane Austen,read,4,,,,", HEADER);
        let report = import_goodreads_csv(&csv, &existing).unwrap();
        assert_eq!(report.books.len(), 1);
        assert_eq!(report.books[0].title, "Emma");
        assert_eq!(report.skipped_duplicates, 1);
    }

    #[test]
    fn test_duplicates_within_file_skipped() {
        let csv = format!("{}\nDune,A,read,1,,,,\ndune,B,read,2,,,,", HEADER);
        let report = import_goodreads_csv(&csv, &[]).unwrap();
        assert_eq!(report.books.len(), 1);
        assert_eq!(report.books[0].author, "A");
        assert_eq!(report.skipped_duplicates, 1);
    }

    #[test]
    fn test_rows_without_title_skipped() {
        let csv = format!("{}\n,NoTitle,read,1,,,,\nEmma,Jane Austen,read,4,,,,", HEADER);
        let report = import_goodreads_csv(&csv, &[]).unwrap();
        assert_eq!(report.books.len(), 1);
        assert_eq!(report.skipped_invalid, 1);
    }

    #[test]
    fn test_bad_rating_and_pages_default_to_zero() {
        let csv = format!("{}\nDune,Frank Herbert,read,not-a-number,,,many,", HEADER);
        let report = import_goodreads_csv(&csv, &[]).unwrap();
        assert_eq!(report.books[0].rating, 0);
        assert_eq!(report.books[0].pages, 0);
    }

    #[test]
    fn test_missing_title_column_is_an_error() {
        let err = import_goodreads_csv("Author,My Rating\nX,5", &[]).unwrap_err();
        assert!(matches!(err, ParseError::MissingColumn(_)));
    }

    #[test]
    fn test_normalize_author() {
        assert_eq!(normalize_author("Herbert, Frank"), "Frank Herbert");
        assert_eq!(normalize_author("Frank Herbert"), "Frank Herbert");
        assert_eq!(normalize_author("Cher,"), "Cher,");
        assert_eq!(normalize_author(""), "Unknown");
    }
}
