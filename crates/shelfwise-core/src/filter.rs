//! Filtering, sorting, and facet derivation
//!
//! Pure functions over the in-memory book set. Nothing here mutates a book
//! or touches storage; the session hands these functions a slice and they
//! hand back an ordered view.

use serde::{Deserialize, Serialize};

use crate::models::{Book, ReadingStatus};

/// Maximum number of authors offered as filter facets
pub const AUTHOR_FACET_LIMIT: usize = 12;

/// One ownership form a book can be held in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnershipKind {
    Physical,
    Digital,
    Borrowed,
}

impl OwnershipKind {
    fn matches(&self, book: &Book) -> bool {
        match self {
            OwnershipKind::Physical => book.own_physical,
            OwnershipKind::Digital => book.own_digital,
            OwnershipKind::Borrowed => book.own_borrowed,
        }
    }
}

impl std::str::FromStr for OwnershipKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "physical" => Ok(OwnershipKind::Physical),
            "digital" => Ok(OwnershipKind::Digital),
            "borrowed" => Ok(OwnershipKind::Borrowed),
            other => Err(format!("unknown ownership kind: {}", other)),
        }
    }
}

impl std::fmt::Display for OwnershipKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OwnershipKind::Physical => "physical",
            OwnershipKind::Digital => "digital",
            OwnershipKind::Borrowed => "borrowed",
        };
        write!(f, "{}", s)
    }
}

/// Sort order for the library view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Title, ascending
    Title,
    /// Author, ascending
    Author,
    /// Rating, descending; unrated books sort last
    Rating,
    /// Finish date, descending on the raw ISO string
    DateRead,
    /// Date added, descending (newest first)
    #[default]
    DateAdded,
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "title" => Ok(SortKey::Title),
            "author" => Ok(SortKey::Author),
            "rating" => Ok(SortKey::Rating),
            "dateread" | "date-read" | "read" => Ok(SortKey::DateRead),
            "dateadded" | "date-added" | "added" => Ok(SortKey::DateAdded),
            other => Err(format!("unknown sort key: {}", other)),
        }
    }
}

/// Ephemeral filter panel state
///
/// Facets combine with AND across facets; within the genre/author/tag
/// facets, membership is OR. `rating` is a sentinel: -1 no constraint,
/// 0 unrated only, 1..=5 at-least-this-many stars.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    /// None = "all"
    pub status: Option<ReadingStatus>,
    /// Every selected form must be owned (AND)
    pub ownership: Vec<OwnershipKind>,
    pub genres: Vec<String>,
    pub authors: Vec<String>,
    pub tags: Vec<String>,
    pub rating: i8,
    /// Case-insensitive substring over title, author, genre, and tags
    pub search: String,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            status: None,
            ownership: Vec::new(),
            genres: Vec::new(),
            authors: Vec::new(),
            tags: Vec::new(),
            rating: -1,
            search: String::new(),
        }
    }
}

impl FilterState {
    /// Whether a single book passes every active predicate
    pub fn matches(&self, book: &Book) -> bool {
        // Free-text search
        let query = self.search.trim().to_lowercase();
        if !query.is_empty() {
            let hit = [&book.title, &book.author, &book.genre]
                .into_iter()
                .chain(book.tags.iter())
                .any(|field| field.to_lowercase().contains(&query));
            if !hit {
                return false;
            }
        }
        // Status
        if let Some(status) = self.status {
            if book.status != status {
                return false;
            }
        }
        // Ownership: every selected form must be held
        if !self.ownership.iter().all(|own| own.matches(book)) {
            return false;
        }
        // Genre / author membership
        if !self.genres.is_empty() && !self.genres.contains(&book.genre) {
            return false;
        }
        if !self.authors.is_empty() && !self.authors.contains(&book.author) {
            return false;
        }
        // Tags: at least one shared tag
        if !self.tags.is_empty() && !self.tags.iter().any(|t| book.tags.contains(t)) {
            return false;
        }
        // Rating sentinel
        if self.rating == 0 && book.rating > 0 {
            return false;
        }
        if self.rating > 0 && book.rating < self.rating as u8 {
            return false;
        }
        true
    }

    /// Number of active filter dimensions (for the filter badge)
    pub fn active_count(&self) -> usize {
        let mut count = 0;
        if self.status.is_some() {
            count += 1;
        }
        count += self.ownership.len();
        count += self.genres.len();
        count += self.authors.len();
        count += self.tags.len();
        if self.rating >= 0 {
            count += 1;
        }
        if !self.search.trim().is_empty() {
            count += 1;
        }
        count
    }

    /// One-line summary of the active filters
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(status) = self.status {
            parts.push(format!("Status: {}", status));
        }
        if !self.ownership.is_empty() {
            let owns: Vec<String> = self.ownership.iter().map(|o| o.to_string()).collect();
            parts.push(format!("Format: {}", owns.join(", ")));
        }
        if !self.genres.is_empty() {
            parts.push(format!("Genre: {}", self.genres.join(", ")));
        }
        if !self.authors.is_empty() {
            let shown = self.authors.iter().take(2).cloned().collect::<Vec<_>>();
            let suffix = if self.authors.len() > 2 { "…" } else { "" };
            parts.push(format!("Author: {}{}", shown.join(", "), suffix));
        }
        if !self.tags.is_empty() {
            parts.push(format!("Tags: {}", self.tags.join(", ")));
        }
        if self.rating == 0 {
            parts.push("Unrated".to_string());
        } else if self.rating > 0 {
            parts.push(format!("{}★+", self.rating));
        }
        if parts.is_empty() {
            "None".to_string()
        } else {
            parts.join(" · ")
        }
    }
}

/// Filter a book set down to the books passing every active predicate
///
/// The result is always a subsequence of the input; applying the same
/// filter twice returns the same set.
pub fn filter_books<'a>(books: &'a [Book], filter: &FilterState) -> Vec<&'a Book> {
    books.iter().filter(|b| filter.matches(b)).collect()
}

/// Stable sort of a filtered view by the given key
///
/// Books with an unset `date_read` carry an empty string, which compares as
/// the lexicographically smallest key; they end up at the tail of the
/// descending order. Kept as-is: the raw-string comparison is the contract.
pub fn sort_books(books: &mut [&Book], key: SortKey) {
    match key {
        SortKey::Title => books.sort_by(|a, b| a.title.cmp(&b.title)),
        SortKey::Author => books.sort_by(|a, b| a.author.cmp(&b.author)),
        SortKey::Rating => books.sort_by(|a, b| b.rating.cmp(&a.rating)),
        SortKey::DateRead => books.sort_by(|a, b| b.date_read.cmp(&a.date_read)),
        SortKey::DateAdded => books.sort_by(|a, b| b.date_added.cmp(&a.date_added)),
    }
}

/// Filter option lists derived from the full (unfiltered) book set
///
/// Always computed from all books so selecting one facet never hides the
/// other options from view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacetOptions {
    /// Distinct non-empty genres, sorted
    pub genres: Vec<String>,
    /// Authors by frequency descending, ties in first-encountered order,
    /// capped at [`AUTHOR_FACET_LIMIT`]
    pub authors: Vec<String>,
    /// Distinct tags across all books, sorted
    pub tags: Vec<String>,
}

/// Derive the facet option lists from the full book set
pub fn facet_options(books: &[Book]) -> FacetOptions {
    let mut genres: Vec<String> = Vec::new();
    for book in books {
        if !book.genre.is_empty() && !genres.contains(&book.genre) {
            genres.push(book.genre.clone());
        }
    }
    genres.sort();

    // First-encounter order, then a stable sort by count keeps tie order
    let mut author_counts: Vec<(String, usize)> = Vec::new();
    for book in books {
        if book.author.is_empty() {
            continue;
        }
        match author_counts.iter_mut().find(|(a, _)| *a == book.author) {
            Some((_, n)) => *n += 1,
            None => author_counts.push((book.author.clone(), 1)),
        }
    }
    author_counts.sort_by(|a, b| b.1.cmp(&a.1));
    let authors = author_counts
        .into_iter()
        .take(AUTHOR_FACET_LIMIT)
        .map(|(a, _)| a)
        .collect();

    let mut tags: Vec<String> = Vec::new();
    for book in books {
        for tag in &book.tags {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
    }
    tags.sort();

    FacetOptions {
        genres,
        authors,
        tags,
    }
}

/// Ownership tallies over the full book set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OwnershipCounts {
    pub total: usize,
    pub physical: usize,
    pub digital: usize,
    pub borrowed: usize,
}

/// Count books per ownership form (a book may count toward several)
pub fn ownership_counts(books: &[Book]) -> OwnershipCounts {
    OwnershipCounts {
        total: books.len(),
        physical: books.iter().filter(|b| b.own_physical).count(),
        digital: books.iter().filter(|b| b.own_digital).count(),
        borrowed: books.iter().filter(|b| b.own_borrowed).count(),
    }
}
