//! Book command handlers

use anyhow::{bail, Result};
use clap::Args;

use shelfwise_core::filter::{filter_books, sort_books, FilterState, OwnershipKind, SortKey};
use shelfwise_core::models::{Book, ReadingStatus};
use shelfwise_core::session::Session;

use crate::output::Output;

/// Arguments for `shelfwise add`
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Book title
    pub title: String,
    /// Author name
    #[arg(short, long)]
    pub author: Option<String>,
    /// Genre
    #[arg(short, long)]
    pub genre: Option<String>,
    /// ISBN
    #[arg(long)]
    pub isbn: Option<String>,
    /// Reading status (want, reading, read, dnf, borrowed)
    #[arg(short, long)]
    pub status: Option<ReadingStatus>,
    /// Rating 1-5 (0 = unrated)
    #[arg(short, long)]
    pub rating: Option<u8>,
    /// Page count
    #[arg(short, long)]
    pub pages: Option<u32>,
    /// Date finished (YYYY-MM-DD)
    #[arg(long)]
    pub date_read: Option<String>,
    /// Date started (YYYY-MM-DD)
    #[arg(long)]
    pub date_started: Option<String>,
    /// Tags (repeatable)
    #[arg(short, long)]
    pub tag: Vec<String>,
    /// Owned as a physical copy
    #[arg(long)]
    pub physical: bool,
    /// Owned as a digital copy
    #[arg(long)]
    pub digital: bool,
    /// Borrowed copy
    #[arg(long)]
    pub borrowed: bool,
    /// Who the book is borrowed from
    #[arg(long)]
    pub borrowed_from: Option<String>,
    /// Notes / review
    #[arg(short, long)]
    pub notes: Option<String>,
}

/// Filter and sort arguments for `shelfwise list`
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Filter by status (want, reading, read, dnf, borrowed)
    #[arg(short, long)]
    pub status: Option<ReadingStatus>,
    /// Filter by genre (repeatable, OR within the facet)
    #[arg(short, long)]
    pub genre: Vec<String>,
    /// Filter by author (repeatable, OR within the facet)
    #[arg(short, long)]
    pub author: Vec<String>,
    /// Filter by tag (repeatable, at least one must match)
    #[arg(short, long)]
    pub tag: Vec<String>,
    /// Only books owned physically
    #[arg(long)]
    pub physical: bool,
    /// Only books owned digitally
    #[arg(long)]
    pub digital: bool,
    /// Only borrowed books
    #[arg(long)]
    pub borrowed: bool,
    /// Minimum rating (1-5)
    #[arg(short, long, conflicts_with = "unrated")]
    pub rating: Option<u8>,
    /// Only unrated books
    #[arg(long)]
    pub unrated: bool,
    /// Free-text search over title, author, genre, and tags
    #[arg(long)]
    pub search: Option<String>,
    /// Sort key (title, author, rating, read, added)
    #[arg(long, default_value = "added")]
    pub sort: SortKeyArg,
}

/// clap-parseable wrapper for the sort key
#[derive(Debug, Clone, Copy)]
pub struct SortKeyArg(pub SortKey);

impl std::str::FromStr for SortKeyArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<SortKey>().map(SortKeyArg)
    }
}

/// Add a new book
pub async fn add(session: &mut Session, args: AddArgs, output: &Output) -> Result<()> {
    let mut book = Book::new(args.title.trim());
    if let Some(author) = args.author {
        book.set_author(author);
    }
    book.genre = args.genre.unwrap_or_default();
    book.isbn = args.isbn.unwrap_or_default();
    book.status = args.status.unwrap_or_default();
    book.rating = args.rating.unwrap_or(0).min(5);
    book.pages = args.pages.unwrap_or(0);
    book.date_read = args.date_read.unwrap_or_default();
    book.date_started = args.date_started.unwrap_or_default();
    book.set_tags(args.tag);
    book.own_physical = args.physical;
    book.own_digital = args.digital;
    book.own_borrowed = args.borrowed;
    if args.physical {
        book.copies = 1;
    }
    book.borrowed_from = args.borrowed_from.unwrap_or_default();
    book.notes = args.notes.unwrap_or_default();

    let id = book.id.clone();
    let title = book.title.clone();
    session.save_book(book).await?;
    session.flush().await;

    if output.is_quiet() {
        println!("{}", id);
    } else {
        output.success(&format!("\"{}\" added to library", title));
    }
    Ok(())
}

/// List books with filters and sorting
pub fn list(session: &Session, args: ListArgs, output: &Output) -> Result<()> {
    let mut ownership = Vec::new();
    if args.physical {
        ownership.push(OwnershipKind::Physical);
    }
    if args.digital {
        ownership.push(OwnershipKind::Digital);
    }
    if args.borrowed {
        ownership.push(OwnershipKind::Borrowed);
    }

    let rating = if args.unrated {
        0
    } else {
        args.rating.map(|r| r.min(5) as i8).unwrap_or(-1)
    };

    let filter = FilterState {
        status: args.status,
        ownership,
        genres: args.genre,
        authors: args.author,
        tags: args.tag,
        rating,
        search: args.search.unwrap_or_default(),
    };

    let mut view = filter_books(session.books(), &filter);
    sort_books(&mut view, args.sort.0);

    if filter.active_count() > 0 {
        output.message(&format!("Filters: {}", filter.describe()));
        output.message("");
    }
    output.print_books(&view);
    Ok(())
}

/// Show full details of one book
pub fn show(session: &Session, id: String, output: &Output) -> Result<()> {
    let book = resolve(session, &id)?;
    output.print_book(book, session.collections());
    Ok(())
}

/// Delete a book
pub async fn delete(session: &mut Session, id: String, output: &Output) -> Result<()> {
    let book = resolve(session, &id)?;
    let title = book.title.clone();
    let book_id = book.id.clone();

    session.delete_book(&book_id).await?;
    session.flush().await;
    output.success(&format!("\"{}\" deleted", title));
    Ok(())
}

/// Resolve a book by exact id, id prefix, or exact title (case-insensitive)
fn resolve<'a>(session: &'a Session, id: &str) -> Result<&'a Book> {
    let books = session.books();
    if let Some(book) = books.iter().find(|b| b.id == id) {
        return Ok(book);
    }
    let prefix_matches: Vec<&Book> = books.iter().filter(|b| b.id.starts_with(id)).collect();
    match prefix_matches.len() {
        1 => return Ok(prefix_matches[0]),
        n if n > 1 => bail!("Id prefix '{}' is ambiguous ({} matches)", id, n),
        _ => {}
    }
    let title_matches: Vec<&Book> = books
        .iter()
        .filter(|b| b.title.eq_ignore_ascii_case(id))
        .collect();
    match title_matches.len() {
        1 => Ok(title_matches[0]),
        n if n > 1 => bail!("Title '{}' is ambiguous ({} matches)", id, n),
        _ => bail!("No book matching '{}'", id),
    }
}
