//! Catalog search command handler

use anyhow::Result;

use shelfwise_core::session::Session;

use crate::catalog::{CatalogBook, CatalogClient, LookupError};
use crate::output::Output;

/// Search the book catalogs by title, or look up a single ISBN
pub async fn search(
    session: &Session,
    query: String,
    isbn: bool,
    output: &Output,
) -> Result<()> {
    let client = CatalogClient::new()?;

    if isbn {
        match client.lookup_isbn(query.trim()).await {
            Ok(Some(book)) => print_results(session, &[book], output),
            Ok(None) => output.message(&format!("No book found for ISBN {}", query)),
            Err(LookupError::AllProvidersFailed) => {
                // Providers down, not a confirmed miss
                output.message("Lookup failed — check your connection.");
            }
            Err(err) => return Err(err.into()),
        }
        return Ok(());
    }

    match client.search(&query).await {
        Ok(results) if results.is_empty() => {
            output.message(&format!("No results for \"{}\"", query));
            output.message("Try a different title, author, or ISBN.");
        }
        Ok(results) => {
            let source = results[0].source.label();
            print_results(session, &results, output);
            output.message(&format!("\n{} results via {}", results.len(), source));
        }
        Err(LookupError::AllProvidersFailed) => {
            output.message("Lookup failed — check your connection.");
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

fn print_results(session: &Session, results: &[CatalogBook], output: &Output) {
    if output.is_json() {
        let rows: Vec<serde_json::Value> = results
            .iter()
            .map(|b| {
                serde_json::json!({
                    "title": b.title,
                    "author": b.author,
                    "isbn": b.isbn,
                    "pages": b.pages,
                    "publisher": b.publisher,
                    "coverUrl": b.cover_url,
                    "source": b.source.label(),
                    "inLibrary": in_library(session, b),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows).unwrap());
        return;
    }

    for book in results {
        let marker = if in_library(session, book) {
            " [in library]"
        } else {
            ""
        };
        let pages = if book.pages > 0 {
            format!(" · {}p", book.pages)
        } else {
            String::new()
        };
        let isbn = if book.isbn.is_empty() {
            String::new()
        } else {
            format!(" · {}", book.isbn)
        };
        println!("{} — {}{}{}{}", book.title, book.author, pages, isbn, marker);
    }
}

/// A catalog hit is "in library" when its ISBN or title already exists
fn in_library(session: &Session, book: &CatalogBook) -> bool {
    session.books().iter().any(|b| {
        (!book.isbn.is_empty() && b.isbn == book.isbn)
            || b.title.eq_ignore_ascii_case(&book.title)
    })
}
