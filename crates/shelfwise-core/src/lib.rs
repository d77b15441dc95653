//! Shelfwise Core Library
//!
//! This crate provides the core functionality for Shelfwise, a local-first
//! personal book tracker: books, collections, and settings live in an
//! abstract remote document store, mirrored to a local cache for offline
//! boot, with all querying done by pure functions over the in-memory set.
//!
//! # Architecture
//!
//! - **Session**: owns the authoritative in-memory state and reconciles it
//!   with the remote store (full-snapshot replace) and the local cache
//!   (write-through mirror)
//! - **Filter/Stats**: pure functions from the book set to ordered views
//!   and aggregate metrics; they never mutate and never touch storage
//!
//! # Quick Start
//!
//! ```text
//! let mut session = Session::new(remote, cache);
//! session.sign_in("connie").await?;
//!
//! let mut book = Book::new("Dune");
//! book.set_author("Frank Herbert");
//! session.save_book(book).await?;
//! session.settle().await;
//!
//! let view = filter_books(session.books(), &FilterState::default());
//! ```
//!
//! # Modules
//!
//! - `session`: reconciliation layer (main entry point)
//! - `models`: Book, Collection, and Settings records
//! - `filter`: filtering, sorting, facet derivation
//! - `stats`: statistics aggregation
//! - `sync`: remote document store contract
//! - `cache`: local write-through cache
//! - `import`/`export`: Goodreads CSV and native backup interchange
//! - `debounce`: cancel-and-reschedule delayed slot
//! - `config`: application configuration

pub mod cache;
pub mod config;
pub mod debounce;
pub mod error;
pub mod export;
pub mod filter;
pub mod import;
pub mod models;
pub mod session;
pub mod stats;
pub mod sync;

pub use cache::CacheStore;
pub use config::Config;
pub use debounce::Debouncer;
pub use error::ValidationError;
pub use export::{export_backup, export_csv, parse_backup, Backup};
pub use filter::{
    facet_options, filter_books, sort_books, FacetOptions, FilterState, OwnershipKind, SortKey,
};
pub use import::{import_goodreads_csv, ImportReport, ParseError};
pub use models::{Book, Collection, ReadingStatus, Settings, Theme};
pub use session::{Session, SessionEvent};
pub use stats::{compute_stats, format_average_rating, LibraryStats};
pub use sync::{MemoryRemote, RemoteStore, SyncError, SyncStatus};
