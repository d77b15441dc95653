//! In-process remote store
//!
//! A document store living in process memory that honors the full
//! [`RemoteStore`] contract, including the snapshot-push semantics: every
//! mutation re-emits the complete collection to all live subscribers. It
//! backs the CLI's local mode and the session tests; a networked client
//! for a hosted store implements the same trait elsewhere.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::Mutex;

use super::{RemoteStore, Snapshot, Subscription, SyncError};

#[derive(Default)]
struct Inner {
    /// collection path -> document id -> body (BTreeMap keeps emission order stable)
    collections: HashMap<String, BTreeMap<String, Value>>,
    /// collection path -> live snapshot senders
    subscribers: HashMap<String, Vec<UnboundedSender<Snapshot>>>,
    /// Total accepted writes (upserts), for assertions
    write_count: usize,
    /// When set, every write and delete fails
    fail_writes: bool,
}

/// In-memory implementation of the remote store contract
#[derive(Default)]
pub struct MemoryRemote {
    inner: Mutex<Inner>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a collection without counting as writes or notifying anyone
    ///
    /// Used to restore a local mode's state from cache before any
    /// subscription exists.
    pub async fn seed(&self, collection_path: &str, docs: Vec<(String, Value)>) {
        let mut inner = self.inner.lock().await;
        let collection = inner
            .collections
            .entry(collection_path.to_string())
            .or_default();
        for (id, doc) in docs {
            collection.insert(id, doc);
        }
    }

    /// Number of accepted upserts so far
    pub async fn write_count(&self) -> usize {
        self.inner.lock().await.write_count
    }

    /// Make subsequent writes and deletes fail (to exercise error paths)
    pub async fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().await.fail_writes = fail;
    }

    /// Re-emit the current contents of a collection to all subscribers
    ///
    /// Simulates a change pushed from another device.
    pub async fn push_snapshot(&self, collection_path: &str) {
        let mut inner = self.inner.lock().await;
        Self::publish(&mut inner, collection_path);
    }

    fn snapshot_of(inner: &Inner, collection_path: &str) -> Snapshot {
        let docs = inner
            .collections
            .get(collection_path)
            .map(|c| {
                c.iter()
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default();
        Snapshot { docs }
    }

    fn publish(inner: &mut Inner, collection_path: &str) {
        let snapshot = Self::snapshot_of(inner, collection_path);
        if let Some(senders) = inner.subscribers.get_mut(collection_path) {
            // Dropped subscriptions fail to send; prune them here
            senders.retain(|tx| tx.send(snapshot.clone()).is_ok());
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn upsert_document(
        &self,
        collection_path: &str,
        id: &str,
        data: Value,
    ) -> Result<(), SyncError> {
        let mut inner = self.inner.lock().await;
        if inner.fail_writes {
            return Err(SyncError::Unavailable("writes disabled".to_string()));
        }
        inner
            .collections
            .entry(collection_path.to_string())
            .or_default()
            .insert(id.to_string(), data);
        inner.write_count += 1;
        Self::publish(&mut inner, collection_path);
        Ok(())
    }

    async fn delete_document(&self, collection_path: &str, id: &str) -> Result<(), SyncError> {
        let mut inner = self.inner.lock().await;
        if inner.fail_writes {
            return Err(SyncError::Unavailable("writes disabled".to_string()));
        }
        if let Some(collection) = inner.collections.get_mut(collection_path) {
            collection.remove(id);
        }
        Self::publish(&mut inner, collection_path);
        Ok(())
    }

    async fn get_document(&self, doc_path: &str) -> Result<Option<Value>, SyncError> {
        let inner = self.inner.lock().await;
        let Some((collection_path, id)) = doc_path.rsplit_once('/') else {
            return Ok(None);
        };
        Ok(inner
            .collections
            .get(collection_path)
            .and_then(|c| c.get(id))
            .cloned())
    }

    async fn subscribe(&self, collection_path: &str) -> Subscription {
        let mut inner = self.inner.lock().await;
        let (tx, rx) = mpsc::unbounded_channel();
        // New subscribers immediately receive the current contents
        let snapshot = Self::snapshot_of(&inner, collection_path);
        let _ = tx.send(snapshot);
        inner
            .subscribers
            .entry(collection_path.to_string())
            .or_default()
            .push(tx);
        Subscription::new(rx)
    }
}
