//! Data models for Shelfwise
//!
//! Defines the core data structures: Book, Collection, and Settings.
//! All three serialize to the camelCase wire form used by the remote
//! document store and the native JSON backup format.

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current time as epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Generate an opaque document id
pub fn gen_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Reading status of a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingStatus {
    /// On the wish list
    #[default]
    Want,
    /// Currently being read
    Reading,
    /// Finished
    Read,
    /// Did not finish
    Dnf,
    /// Borrowed out / lent
    Borrowed,
}

impl ReadingStatus {
    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            ReadingStatus::Want => "Want to Read",
            ReadingStatus::Reading => "Reading",
            ReadingStatus::Read => "Read",
            ReadingStatus::Dnf => "DNF",
            ReadingStatus::Borrowed => "Borrowed",
        }
    }

    /// All statuses, in display order
    pub fn all() -> [ReadingStatus; 5] {
        [
            ReadingStatus::Want,
            ReadingStatus::Reading,
            ReadingStatus::Read,
            ReadingStatus::Dnf,
            ReadingStatus::Borrowed,
        ]
    }
}

impl std::str::FromStr for ReadingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "want" => Ok(ReadingStatus::Want),
            "reading" => Ok(ReadingStatus::Reading),
            "read" => Ok(ReadingStatus::Read),
            "dnf" => Ok(ReadingStatus::Dnf),
            "borrowed" => Ok(ReadingStatus::Borrowed),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

impl std::fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReadingStatus::Want => "want",
            ReadingStatus::Reading => "reading",
            ReadingStatus::Read => "read",
            ReadingStatus::Dnf => "dnf",
            ReadingStatus::Borrowed => "borrowed",
        };
        write!(f, "{}", s)
    }
}

/// A tracked book
///
/// Dates read/started are kept as raw `YYYY-MM-DD` strings (empty = unset):
/// sorting compares them lexicographically and the month histogram reads
/// characters 5-6 directly, so the string form is the source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Book {
    /// Unique identifier within one user's library
    pub id: String,
    /// Display title (required, non-empty before any write)
    pub title: String,
    /// Author, "Unknown" when not provided
    pub author: String,
    pub genre: String,
    pub isbn: String,
    pub publisher: String,
    pub description: String,
    pub cover_url: String,
    pub status: ReadingStatus,
    /// 0 = unrated, 1..=5 stars
    pub rating: u8,
    /// ISO date the book was started, empty = unset
    pub date_started: String,
    /// ISO date the book was finished, empty = unset
    pub date_read: String,
    pub pages: u32,
    pub pages_read: u32,
    pub own_physical: bool,
    pub own_digital: bool,
    pub own_borrowed: bool,
    /// Number of physical copies, meaningful only with `own_physical`
    pub copies: u32,
    /// Who the book is borrowed from, meaningful only with `own_borrowed`
    pub borrowed_from: String,
    /// Tags in insertion order, no duplicates
    pub tags: Vec<String>,
    /// Ids of collections this book belongs to
    pub collections: Vec<String>,
    /// Free-text notes / review
    pub notes: String,
    /// Epoch millis, set once at creation
    pub date_added: i64,
    /// Epoch millis, set on every write
    pub updated_at: i64,
}

impl Default for Book {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            author: "Unknown".to_string(),
            genre: String::new(),
            isbn: String::new(),
            publisher: String::new(),
            description: String::new(),
            cover_url: String::new(),
            status: ReadingStatus::Want,
            rating: 0,
            date_started: String::new(),
            date_read: String::new(),
            pages: 0,
            pages_read: 0,
            own_physical: false,
            own_digital: false,
            own_borrowed: false,
            copies: 0,
            borrowed_from: String::new(),
            tags: Vec::new(),
            collections: Vec::new(),
            notes: String::new(),
            date_added: 0,
            updated_at: 0,
        }
    }
}

impl Book {
    /// Create a new book with the given title
    pub fn new(title: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: gen_id(),
            title: title.into(),
            date_added: now,
            updated_at: now,
            ..Self::default()
        }
    }

    /// Create a book with a specific id (for loading from storage)
    pub fn with_id(id: impl Into<String>, title: impl Into<String>) -> Self {
        let mut book = Self::new(title);
        book.id = id.into();
        book
    }

    /// Set the author; blank input falls back to "Unknown"
    pub fn set_author(&mut self, author: impl Into<String>) {
        let author = author.into();
        self.author = if author.trim().is_empty() {
            "Unknown".to_string()
        } else {
            author
        };
        self.touch();
    }

    /// Set the reading status
    pub fn set_status(&mut self, status: ReadingStatus) {
        self.status = status;
        self.touch();
    }

    /// Set the rating, clamped to 0..=5
    pub fn set_rating(&mut self, rating: u8) {
        self.rating = rating.min(5);
        self.touch();
    }

    /// Add a tag, preserving insertion order and skipping duplicates
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
            self.touch();
        }
    }

    /// Remove a tag
    pub fn remove_tag(&mut self, tag: &str) {
        if let Some(pos) = self.tags.iter().position(|t| t == tag) {
            self.tags.remove(pos);
            self.touch();
        }
    }

    /// Replace all tags, dropping duplicates but keeping first-seen order
    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.tags.clear();
        for tag in tags {
            if !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
        self.touch();
    }

    /// Reading progress percent (display-only, clamped to 100)
    pub fn progress_percent(&self) -> u32 {
        if self.pages == 0 || self.pages_read == 0 {
            return 0;
        }
        (self.pages_read * 100 / self.pages).min(100)
    }

    /// Whether the book is owned in any form
    pub fn is_owned(&self) -> bool {
        self.own_physical || self.own_digital || self.own_borrowed
    }

    /// Update the modification timestamp
    pub fn touch(&mut self) {
        self.updated_at = now_millis();
    }
}

/// A named, emoji-tagged grouping of books
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub emoji: String,
    /// Epoch millis
    pub created_at: i64,
}

impl Default for Collection {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            emoji: "📚".to_string(),
            created_at: 0,
        }
    }
}

impl Collection {
    /// Create a new collection with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: gen_id(),
            name: name.into(),
            emoji: "📚".to_string(),
            created_at: now_millis(),
        }
    }

    /// Set the emoji glyph
    pub fn with_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = emoji.into();
        self
    }
}

/// Color theme
///
/// Unknown theme names from older documents deserialize as `Dark`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Theme {
    #[default]
    Dark,
    Light,
    Midnight,
    Forest,
    Rose,
    Slate,
}

impl From<String> for Theme {
    fn from(value: String) -> Self {
        value.parse().unwrap_or(Theme::Dark)
    }
}

impl Theme {
    /// All themes, in display order
    pub fn all() -> [Theme; 6] {
        [
            Theme::Dark,
            Theme::Light,
            Theme::Midnight,
            Theme::Forest,
            Theme::Rose,
            Theme::Slate,
        ]
    }
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            "midnight" => Ok(Theme::Midnight),
            "forest" => Ok(Theme::Forest),
            "rose" => Ok(Theme::Rose),
            "slate" => Ok(Theme::Slate),
            other => Err(format!("unknown theme: {}", other)),
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
            Theme::Midnight => "midnight",
            Theme::Forest => "forest",
            Theme::Rose => "rose",
            Theme::Slate => "slate",
        };
        write!(f, "{}", s)
    }
}

/// Per-user settings singleton
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub theme: Theme,
    /// Annual reading-count target, 0 = no goal
    pub goal: u32,
    pub goal_year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            goal: 0,
            goal_year: Utc::now().year(),
            display_name: None,
        }
    }
}

/// Partial settings as stored remotely; absent fields keep current values
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SettingsPatch {
    theme: Option<Theme>,
    goal: Option<u32>,
    goal_year: Option<i32>,
    display_name: Option<String>,
}

impl Settings {
    /// Shallow-merge a remote settings document over the current values
    ///
    /// Unknown fields are ignored; a document that is not an object leaves
    /// the settings untouched.
    pub fn merge_json(&mut self, value: &serde_json::Value) {
        let Ok(patch) = serde_json::from_value::<SettingsPatch>(value.clone()) else {
            return;
        };
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(goal) = patch.goal {
            self.goal = goal;
        }
        if let Some(goal_year) = patch.goal_year {
            self.goal_year = goal_year;
        }
        if let Some(display_name) = patch.display_name {
            self.display_name = Some(display_name);
        }
    }
}
