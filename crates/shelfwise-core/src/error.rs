//! Error types shared across the core
//!
//! Sync errors live in the `sync` module; import parse errors in `import`.

use thiserror::Error;

/// Validation failures, rejected before any write reaches the remote store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A book needs a non-empty title
    #[error("Book title must not be empty")]
    EmptyTitle,

    /// A collection needs a non-empty name
    #[error("Collection name must not be empty")]
    EmptyCollectionName,

    /// Rating outside 0..=5
    #[error("Rating must be between 0 and 5, got {0}")]
    RatingOutOfRange(u8),
}
