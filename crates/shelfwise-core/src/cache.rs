//! Local cache store
//!
//! Durable JSON mirror of the user's books, collections, and settings,
//! used as a fast-start snapshot and offline fallback. The cache is
//! overwritten wholesale on every authoritative snapshot; it is never the
//! source of truth while a session is live.
//!
//! Files under the data directory:
//! - `books.json`
//! - `collections.json`
//! - `settings.json`
//!
//! Writes are atomic (write to temp file, fsync, rename) so a crash never
//! leaves a half-written cache behind.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::models::{Book, Collection, Settings};

/// Write-through cache of the library on local disk
#[derive(Debug, Clone)]
pub struct CacheStore {
    data_dir: PathBuf,
}

impl CacheStore {
    /// Create a cache store rooted at the given data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Path to the cached book list
    pub fn books_path(&self) -> PathBuf {
        self.data_dir.join("books.json")
    }

    /// Path to the cached collection list
    pub fn collections_path(&self) -> PathBuf {
        self.data_dir.join("collections.json")
    }

    /// Path to the cached settings document
    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    /// Overwrite the cached book list
    pub fn save_books(&self, books: &[Book]) -> Result<()> {
        self.write_json(&self.books_path(), &books)
    }

    /// Load the cached book list, `None` when absent or unreadable
    pub fn load_books(&self) -> Option<Vec<Book>> {
        self.read_json(&self.books_path())
    }

    /// Overwrite the cached collection list
    pub fn save_collections(&self, collections: &[Collection]) -> Result<()> {
        self.write_json(&self.collections_path(), &collections)
    }

    /// Load the cached collection list, `None` when absent or unreadable
    pub fn load_collections(&self) -> Option<Vec<Collection>> {
        self.read_json(&self.collections_path())
    }

    /// Overwrite the cached settings
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.write_json(&self.settings_path(), settings)
    }

    /// Load the cached settings, `None` when absent or unreadable
    pub fn load_settings(&self) -> Option<Settings> {
        self.read_json(&self.settings_path())
    }

    /// Delete all cached data
    pub fn clear(&self) -> Result<()> {
        let paths = [
            self.books_path(),
            self.collections_path(),
            self.settings_path(),
        ];
        for path in paths {
            if path.exists() {
                fs::remove_file(&path).with_context(|| format!("Failed to delete {:?}", path))?;
            }
        }
        Ok(())
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let json = serde_json::to_vec_pretty(value).context("Failed to serialize cache data")?;
        atomic_write(path, &json).with_context(|| format!("Failed to write cache {:?}", path))
    }

    /// Read and parse a cache file
    ///
    /// A missing or corrupt cache is not an error: boot continues with an
    /// empty state and the next snapshot rewrites the file.
    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Option<T> {
        if !path.exists() {
            return None;
        }
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                warn!("Failed to read cache {:?}: {}", path, err);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("Ignoring corrupt cache {:?}: {}", path, err);
                None
            }
        }
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// This ensures the target file is never left in a partially-written state.
fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }

    let temp_path = path.with_extension("tmp");

    let mut file = File::create(&temp_path)
        .with_context(|| format!("Failed to create temp file {:?}", temp_path))?;

    file.write_all(data)
        .with_context(|| format!("Failed to write to temp file {:?}", temp_path))?;

    file.sync_all()
        .with_context(|| format!("Failed to sync temp file {:?}", temp_path))?;

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename {:?} to {:?}", temp_path, path))?;

    Ok(())
}
