//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use shelfwise_core::models::{Book, Collection};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Check if output is in JSON mode
    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print an informational message (suppressed in quiet and JSON modes)
    pub fn message(&self, text: &str) {
        if matches!(self.format, OutputFormat::Human) {
            println!("{}", text);
        }
    }

    /// Print a success message
    pub fn success(&self, text: &str) {
        if matches!(self.format, OutputFormat::Human) {
            println!("✓ {}", text);
        }
    }

    /// Print a single book with full details
    pub fn print_book(&self, book: &Book, collections: &[Collection]) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", book.id);
                println!("Title:    {}", book.title);
                println!("Author:   {}", book.author);
                if !book.genre.is_empty() {
                    println!("Genre:    {}", book.genre);
                }
                if !book.isbn.is_empty() {
                    println!("ISBN:     {}", book.isbn);
                }
                println!("Status:   {}", book.status.label());
                if book.rating > 0 {
                    println!("Rating:   {}", stars(book.rating));
                }
                if !book.date_started.is_empty() {
                    println!("Started:  {}", book.date_started);
                }
                if !book.date_read.is_empty() {
                    println!("Finished: {}", book.date_read);
                }
                if book.pages > 0 {
                    let progress = book.progress_percent();
                    if progress > 0 {
                        println!(
                            "Pages:    {} ({} read, {}%)",
                            book.pages, book.pages_read, progress
                        );
                    } else {
                        println!("Pages:    {}", book.pages);
                    }
                }
                let ownership = ownership_line(book);
                if !ownership.is_empty() {
                    println!("Owned:    {}", ownership);
                }
                if !book.tags.is_empty() {
                    println!("Tags:     {}", book.tags.join(", "));
                }
                // Dangling collection ids are filtered at render time
                let names: Vec<String> = book
                    .collections
                    .iter()
                    .filter_map(|id| collections.iter().find(|c| &c.id == id))
                    .map(|c| format!("{} {}", c.emoji, c.name))
                    .collect();
                if !names.is_empty() {
                    println!("In:       {}", names.join(", "));
                }
                if !book.notes.is_empty() {
                    println!();
                    println!("── Notes ──");
                    println!("{}", book.notes);
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(book).unwrap());
            }
            OutputFormat::Quiet => {
                println!("{}", book.id);
            }
        }
    }

    /// Print a list of books, one line each
    pub fn print_books(&self, books: &[&Book]) {
        match self.format {
            OutputFormat::Human => {
                if books.is_empty() {
                    println!("No books found.");
                    return;
                }
                for book in books {
                    let rating = if book.rating > 0 {
                        format!(" {}", stars(book.rating))
                    } else {
                        String::new()
                    };
                    println!(
                        "{} | {} | {} | {}{}",
                        &book.id[..book.id.len().min(8)],
                        truncate(&book.title, 34),
                        truncate(&book.author, 24),
                        book.status.label(),
                        rating
                    );
                }
                println!("\n{} book(s)", books.len());
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(books).unwrap());
            }
            OutputFormat::Quiet => {
                for book in books {
                    println!("{}", book.id);
                }
            }
        }
    }

    /// Print collections with their book counts
    pub fn print_collections(&self, collections: &[Collection], counts: &[usize]) {
        match self.format {
            OutputFormat::Human => {
                if collections.is_empty() {
                    println!("No collections yet.");
                    return;
                }
                for (collection, count) in collections.iter().zip(counts) {
                    println!(
                        "{} | {} {} | {} book(s)",
                        &collection.id[..collection.id.len().min(8)],
                        collection.emoji,
                        collection.name,
                        count
                    );
                }
            }
            OutputFormat::Json => {
                let rows: Vec<serde_json::Value> = collections
                    .iter()
                    .zip(counts)
                    .map(|(c, n)| {
                        serde_json::json!({
                            "id": c.id,
                            "name": c.name,
                            "emoji": c.emoji,
                            "books": n,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows).unwrap());
            }
            OutputFormat::Quiet => {
                for collection in collections {
                    println!("{}", collection.id);
                }
            }
        }
    }
}

/// Star string for a rating
pub fn stars(rating: u8) -> String {
    "★".repeat(rating as usize)
}

fn ownership_line(book: &Book) -> String {
    let mut parts = Vec::new();
    if book.own_physical {
        if book.copies > 1 {
            parts.push(format!("physical ({} copies)", book.copies));
        } else {
            parts.push("physical".to_string());
        }
    }
    if book.own_digital {
        parts.push("digital".to_string());
    }
    if book.own_borrowed {
        if book.borrowed_from.is_empty() {
            parts.push("borrowed".to_string());
        } else {
            parts.push(format!("borrowed from {}", book.borrowed_from));
        }
    }
    parts.join(", ")
}

/// Truncate a string for single-line display
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        // Quiet wins over json
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long book title", 10), "a very lo…");
    }

    #[test]
    fn test_stars() {
        assert_eq!(stars(3), "★★★");
        assert_eq!(stars(0), "");
    }

    #[test]
    fn test_ownership_line() {
        let mut book = Book::new("Dune");
        assert_eq!(ownership_line(&book), "");
        book.own_physical = true;
        book.copies = 2;
        book.own_borrowed = true;
        book.borrowed_from = "Sam".to_string();
        assert_eq!(
            ownership_line(&book),
            "physical (2 copies), borrowed from Sam"
        );
    }
}
