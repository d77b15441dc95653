//! Remote store contract
//!
//! The remote document store (and the identity provider in front of it) is
//! an external collaborator: this module only defines the contract the
//! reconciliation session consumes. Documents live under a per-user
//! namespace, one logical collection per entity kind plus a singleton
//! settings document:
//!
//! - `users/{uid}/books`
//! - `users/{uid}/collections`
//! - `users/{uid}/config/settings`
//!
//! Subscriptions deliver full snapshots, never deltas: each notification
//! carries the complete current contents of its collection, so applying a
//! snapshot is idempotent and out-of-order delivery cannot corrupt state.

pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

pub use memory::MemoryRemote;

/// Errors from remote document operations
#[derive(Error, Debug, Clone)]
pub enum SyncError {
    /// Network failure or the store is unreachable
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    /// The signed-in user may not touch this path
    #[error("Permission denied for '{0}'")]
    PermissionDenied(String),

    /// The store rejected the write
    #[error("Remote write rejected: {0}")]
    Rejected(String),
}

/// Connection/sync indicator shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// All writes acknowledged
    Synced,
    /// A write or initial load is in flight
    Syncing,
    /// The last remote operation failed
    Error,
}

/// The two snapshot-subscribed entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Books,
    Collections,
}

impl EntityKind {
    /// Remote collection path for this kind under the given user
    pub fn collection_path(&self, user: &str) -> String {
        match self {
            EntityKind::Books => format!("users/{}/books", user),
            EntityKind::Collections => format!("users/{}/collections", user),
        }
    }
}

/// Path of the per-user settings singleton document
pub fn settings_collection_path(user: &str) -> String {
    format!("users/{}/config", user)
}

/// Id of the settings document within its collection
pub const SETTINGS_DOC_ID: &str = "settings";

/// Full document path of the per-user settings singleton
pub fn settings_doc_path(user: &str) -> String {
    format!("{}/{}", settings_collection_path(user), SETTINGS_DOC_ID)
}

/// A full replacement push of one collection's current contents
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// `(document id, document body)` pairs, complete for the collection
    pub docs: Vec<(String, Value)>,
}

/// A live snapshot subscription for one entity kind
///
/// Dropping the subscription detaches it from the store; the reconciliation
/// layer holds exactly one per kind per signed-in session and drops them on
/// sign-out before any new ones are created.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Snapshot>,
}

impl Subscription {
    /// Wrap a snapshot receiver
    pub fn new(rx: mpsc::UnboundedReceiver<Snapshot>) -> Self {
        Self { rx }
    }

    /// Wait for the next snapshot; `None` when the store went away
    pub async fn recv(&mut self) -> Option<Snapshot> {
        self.rx.recv().await
    }

    /// Take a snapshot if one is already queued
    pub fn try_recv(&mut self) -> Option<Snapshot> {
        self.rx.try_recv().ok()
    }
}

/// Contract of the remote document store
///
/// All calls are non-blocking requests resolved asynchronously; failures
/// are reported, never panicked on, and never rolled back locally.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Create or overwrite one document
    async fn upsert_document(
        &self,
        collection_path: &str,
        id: &str,
        data: Value,
    ) -> Result<(), SyncError>;

    /// Delete one document; deleting a missing document is not an error
    async fn delete_document(&self, collection_path: &str, id: &str) -> Result<(), SyncError>;

    /// Fetch one document by full path, `None` when it does not exist
    async fn get_document(&self, doc_path: &str) -> Result<Option<Value>, SyncError>;

    /// Subscribe to full-snapshot notifications for one collection
    ///
    /// The current contents are delivered as the first snapshot.
    async fn subscribe(&self, collection_path: &str) -> Subscription;
}
