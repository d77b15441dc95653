//! Reconciliation session
//!
//! The `Session` owns the authoritative in-memory state for one signed-in
//! user and coordinates between:
//! - the remote document store (source of truth)
//! - the local cache (fast-start snapshot, offline fallback)
//!
//! ## Data flow
//!
//! Mutations are written to the remote store only; the in-memory state
//! changes when the store pushes back a full snapshot. Snapshots replace
//! the whole array for their kind, so applying them is idempotent and
//! delivery order cannot corrupt state. The cache mirror is rewritten
//! wholesale on every applied snapshot.
//!
//! Settings are the exception: the cache is written synchronously on every
//! settings change, while the remote write is debounced so rapid edits
//! collapse into a single upsert of the final value.
//!
//! ## Usage
//!
//! ```ignore
//! let mut session = Session::new(remote, cache);
//! session.sign_in("connie").await?;
//!
//! session.save_book(book).await?;
//! session.settle().await;          // apply the resulting snapshot
//!
//! let stats = compute_stats(session.books(), session.settings(), today);
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Duration, Instant};
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::debounce::Debouncer;
use crate::error::ValidationError;
use crate::models::{gen_id, Book, Collection, Settings, Theme};
use crate::sync::{
    settings_collection_path, settings_doc_path, EntityKind, RemoteStore, Snapshot, Subscription,
    SyncStatus, SETTINGS_DOC_ID,
};

/// Window for collapsing rapid settings writes into one remote upsert
pub const SETTINGS_DEBOUNCE: Duration = Duration::from_millis(800);
/// Window for coalescing rapid snapshot arrivals into one refresh event
pub const REFRESH_DEBOUNCE: Duration = Duration::from_millis(50);

/// Which entity kinds changed since the last refresh event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dirty {
    pub books: bool,
    pub collections: bool,
}

/// Events emitted toward the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Authoritative state changed; recompute any derived views
    Refresh(Dirty),
    /// A remote write or subscription failed
    SyncFailed(String),
}

/// Authoritative state holder and remote/cache coordinator
pub struct Session {
    remote: Arc<dyn RemoteStore>,
    cache: CacheStore,
    user: Option<String>,
    books: Vec<Book>,
    collections: Vec<Collection>,
    settings: Settings,
    books_sub: Option<Subscription>,
    collections_sub: Option<Subscription>,
    settings_debounce: Debouncer<Settings>,
    refresh_debounce: Debouncer<()>,
    dirty: Dirty,
    status: watch::Sender<SyncStatus>,
    status_rx: watch::Receiver<SyncStatus>,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
    event_rx: Option<mpsc::UnboundedReceiver<SessionEvent>>,
}

impl Session {
    /// Create a session over a remote store and local cache
    pub fn new(remote: Arc<dyn RemoteStore>, cache: CacheStore) -> Self {
        let (status_tx, status_rx) = watch::channel(SyncStatus::Synced);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            remote,
            cache,
            user: None,
            books: Vec::new(),
            collections: Vec::new(),
            settings: Settings::default(),
            books_sub: None,
            collections_sub: None,
            settings_debounce: Debouncer::new(SETTINGS_DEBOUNCE),
            refresh_debounce: Debouncer::new(REFRESH_DEBOUNCE),
            dirty: Dirty::default(),
            status: status_tx,
            status_rx,
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    // ==================== Accessors ====================

    /// Authoritative book list, newest first
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    /// Authoritative collection list
    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    /// Current settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Signed-in user id, if any
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Current sync status
    pub fn status(&self) -> SyncStatus {
        *self.status_rx.borrow()
    }

    /// Subscribe to sync status changes
    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status_rx.clone()
    }

    /// Take the event receiver (can only be called once)
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<SessionEvent>> {
        self.event_rx.take()
    }

    // ==================== Lifecycle ====================

    /// Sign a user in: boot from cache, load settings, subscribe to snapshots
    ///
    /// Any previous user's subscriptions and state are torn down first so
    /// nothing leaks into the new session's first render.
    pub async fn sign_in(&mut self, user: &str) -> Result<()> {
        if self.user.is_some() {
            self.sign_out().await;
        }
        info!("Signing in user '{}'", user);
        self.user = Some(user.to_string());
        self.set_status(SyncStatus::Syncing);

        // Fast start from the local cache; the first snapshot replaces this
        if let Some(mut books) = self.cache.load_books() {
            books.sort_by(|a, b| b.date_added.cmp(&a.date_added));
            self.books = books;
        }
        if let Some(collections) = self.cache.load_collections() {
            self.collections = collections;
        }
        if let Some(settings) = self.cache.load_settings() {
            self.settings = settings;
        }

        // Remote settings shallow-merge over whatever we booted with
        match self.remote.get_document(&settings_doc_path(user)).await {
            Ok(Some(doc)) => {
                self.settings.merge_json(&doc);
                if let Err(err) = self.cache.save_settings(&self.settings) {
                    warn!("Failed to mirror settings to cache: {}", err);
                }
            }
            Ok(None) => debug!("No remote settings document yet, keeping defaults"),
            Err(err) => {
                warn!("Failed to load settings: {}", err);
                self.emit(SessionEvent::SyncFailed(err.to_string()));
            }
        }

        // Exactly one live subscription per kind
        self.books_sub = Some(
            self.remote
                .subscribe(&EntityKind::Books.collection_path(user))
                .await,
        );
        self.collections_sub = Some(
            self.remote
                .subscribe(&EntityKind::Collections.collection_path(user))
                .await,
        );

        self.set_status(SyncStatus::Synced);
        // Apply the initial snapshots delivered on subscribe
        self.settle().await;
        Ok(())
    }

    /// Sign out: flush pending writes, drop subscriptions, clear state
    pub async fn sign_out(&mut self) {
        // A pending debounced settings write still belongs to this user
        if let Some(settings) = self.settings_debounce.flush() {
            self.write_settings_remote(settings).await;
        }
        self.refresh_debounce.cancel();
        self.books_sub = None;
        self.collections_sub = None;
        self.books.clear();
        self.collections.clear();
        self.settings = Settings::default();
        self.dirty = Dirty::default();
        if let Some(user) = self.user.take() {
            info!("Signed out user '{}'", user);
        }
        self.set_status(SyncStatus::Synced);
    }

    // ==================== Book Operations ====================

    /// Validate and upsert a book remotely
    ///
    /// The in-memory state is not mutated here; it updates when the next
    /// snapshot arrives (no optimistic local write).
    pub async fn save_book(&mut self, mut book: Book) -> Result<()> {
        if book.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }
        if book.id.is_empty() {
            book.id = gen_id();
        }
        if book.author.trim().is_empty() {
            book.author = "Unknown".to_string();
        }
        book.touch();

        let path = EntityKind::Books.collection_path(self.require_user()?);
        let value = serde_json::to_value(&book).context("Failed to serialize book")?;

        self.set_status(SyncStatus::Syncing);
        match self.remote.upsert_document(&path, &book.id, value).await {
            Ok(()) => {
                debug!("Saved book '{}' ({})", book.title, book.id);
                self.set_status(SyncStatus::Synced);
                Ok(())
            }
            Err(err) => {
                warn!("Failed to save book '{}': {}", book.title, err);
                self.set_status(SyncStatus::Error);
                self.emit(SessionEvent::SyncFailed(err.to_string()));
                Err(err).context("Failed to save book remotely")
            }
        }
    }

    /// Request remote deletion of a book
    pub async fn delete_book(&mut self, id: &str) -> Result<()> {
        let path = EntityKind::Books.collection_path(self.require_user()?);
        self.set_status(SyncStatus::Syncing);
        match self.remote.delete_document(&path, id).await {
            Ok(()) => {
                debug!("Deleted book {}", id);
                self.set_status(SyncStatus::Synced);
                Ok(())
            }
            Err(err) => {
                self.set_status(SyncStatus::Error);
                self.emit(SessionEvent::SyncFailed(err.to_string()));
                Err(err).context("Failed to delete book remotely")
            }
        }
    }

    // ==================== Collection Operations ====================

    /// Validate and upsert a collection remotely
    pub async fn save_collection(&mut self, mut collection: Collection) -> Result<()> {
        if collection.name.trim().is_empty() {
            return Err(ValidationError::EmptyCollectionName.into());
        }
        if collection.id.is_empty() {
            collection.id = gen_id();
        }
        let path = EntityKind::Collections.collection_path(self.require_user()?);
        let value = serde_json::to_value(&collection).context("Failed to serialize collection")?;
        match self.remote.upsert_document(&path, &collection.id, value).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.set_status(SyncStatus::Error);
                self.emit(SessionEvent::SyncFailed(err.to_string()));
                Err(err).context("Failed to save collection remotely")
            }
        }
    }

    /// Request remote deletion of a collection
    ///
    /// Books keep any dangling reference to the deleted id; renderers
    /// filter unknown ids rather than the data layer cleaning them up.
    pub async fn delete_collection(&mut self, id: &str) -> Result<()> {
        let path = EntityKind::Collections.collection_path(self.require_user()?);
        match self.remote.delete_document(&path, id).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.set_status(SyncStatus::Error);
                self.emit(SessionEvent::SyncFailed(err.to_string()));
                Err(err).context("Failed to delete collection remotely")
            }
        }
    }

    // ==================== Settings ====================

    /// Replace the settings wholesale
    pub fn update_settings(&mut self, settings: Settings) -> Result<()> {
        self.settings = settings;
        self.persist_settings()
    }

    /// Set the color theme
    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        self.settings.theme = theme;
        self.persist_settings()
    }

    /// Set the annual reading goal for the current year
    pub fn set_goal(&mut self, goal: u32) -> Result<()> {
        self.settings.goal = goal;
        self.settings.goal_year = Utc::now().year();
        self.persist_settings()
    }

    /// Set the display name
    pub fn set_display_name(&mut self, name: impl Into<String>) -> Result<()> {
        self.settings.display_name = Some(name.into());
        self.persist_settings()
    }

    /// Cache synchronously, debounce the remote write
    fn persist_settings(&mut self) -> Result<()> {
        self.cache
            .save_settings(&self.settings)
            .context("Failed to write settings cache")?;
        self.settings_debounce
            .schedule(self.settings.clone(), Instant::now());
        Ok(())
    }

    // ==================== Event Loop ====================

    /// Apply queued snapshots and fire timers until the session is quiescent
    ///
    /// Waits out pending debounce windows; under a paused test clock this
    /// resolves immediately.
    pub async fn settle(&mut self) {
        loop {
            let applied = self.drain_snapshots();
            self.fire_due().await;
            if applied {
                continue;
            }
            match self.next_deadline() {
                Some(deadline) => {
                    sleep_until(deadline).await;
                    self.fire_due().await;
                }
                None => break,
            }
        }
    }

    /// Apply queued snapshots and force-fire pending timers immediately
    ///
    /// Used on shutdown paths where waiting out a debounce window makes no
    /// sense.
    pub async fn flush(&mut self) {
        self.drain_snapshots();
        if let Some(settings) = self.settings_debounce.flush() {
            self.write_settings_remote(settings).await;
        }
        if self.refresh_debounce.flush().is_some() {
            self.emit_refresh();
        }
        self.drain_snapshots();
    }

    /// Apply every queued snapshot; returns whether any were applied
    fn drain_snapshots(&mut self) -> bool {
        let mut book_snaps = Vec::new();
        if let Some(sub) = self.books_sub.as_mut() {
            while let Some(snap) = sub.try_recv() {
                book_snaps.push(snap);
            }
        }
        let mut collection_snaps = Vec::new();
        if let Some(sub) = self.collections_sub.as_mut() {
            while let Some(snap) = sub.try_recv() {
                collection_snaps.push(snap);
            }
        }

        let applied = !book_snaps.is_empty() || !collection_snaps.is_empty();
        for snap in book_snaps {
            self.apply_books_snapshot(snap);
        }
        for snap in collection_snaps {
            self.apply_collections_snapshot(snap);
        }
        applied
    }

    /// Fire any timers whose deadline has passed
    async fn fire_due(&mut self) {
        let now = Instant::now();
        if let Some(settings) = self.settings_debounce.fire_due(now) {
            self.write_settings_remote(settings).await;
        }
        if self.refresh_debounce.fire_due(now).is_some() {
            self.emit_refresh();
        }
    }

    /// Earliest pending timer deadline
    fn next_deadline(&self) -> Option<Instant> {
        match (
            self.settings_debounce.deadline(),
            self.refresh_debounce.deadline(),
        ) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Replace the book list with a snapshot's contents
    ///
    /// Full replace, not a merge: the snapshot is the authoritative state.
    fn apply_books_snapshot(&mut self, snapshot: Snapshot) {
        let mut books: Vec<Book> = Vec::with_capacity(snapshot.docs.len());
        for (id, doc) in snapshot.docs {
            match serde_json::from_value::<Book>(doc) {
                Ok(mut book) => {
                    book.id = id;
                    books.push(book);
                }
                Err(err) => warn!("Skipping malformed book document '{}': {}", id, err),
            }
        }
        books.sort_by(|a, b| b.date_added.cmp(&a.date_added));
        debug!("Applied books snapshot: {} books", books.len());
        self.books = books;
        if let Err(err) = self.cache.save_books(&self.books) {
            warn!("Failed to mirror books to cache: {}", err);
        }
        self.dirty.books = true;
        self.refresh_debounce.schedule((), Instant::now());
    }

    /// Replace the collection list with a snapshot's contents
    fn apply_collections_snapshot(&mut self, snapshot: Snapshot) {
        let mut collections: Vec<Collection> = Vec::with_capacity(snapshot.docs.len());
        for (id, doc) in snapshot.docs {
            match serde_json::from_value::<Collection>(doc) {
                Ok(mut collection) => {
                    collection.id = id;
                    collections.push(collection);
                }
                Err(err) => warn!("Skipping malformed collection document '{}': {}", id, err),
            }
        }
        debug!(
            "Applied collections snapshot: {} collections",
            collections.len()
        );
        self.collections = collections;
        if let Err(err) = self.cache.save_collections(&self.collections) {
            warn!("Failed to mirror collections to cache: {}", err);
        }
        self.dirty.collections = true;
        self.refresh_debounce.schedule((), Instant::now());
    }

    /// Write the debounced settings value to the remote store
    async fn write_settings_remote(&mut self, settings: Settings) {
        let Some(user) = self.user.clone() else {
            return;
        };
        let path = settings_collection_path(&user);
        let value = match serde_json::to_value(&settings) {
            Ok(value) => value,
            Err(err) => {
                warn!("Failed to serialize settings: {}", err);
                return;
            }
        };
        match self.remote.upsert_document(&path, SETTINGS_DOC_ID, value).await {
            Ok(()) => {
                debug!("Settings written remotely");
                self.set_status(SyncStatus::Synced);
            }
            Err(err) => {
                warn!("Failed to write settings: {}", err);
                self.set_status(SyncStatus::Error);
                self.emit(SessionEvent::SyncFailed(err.to_string()));
            }
        }
    }

    fn emit_refresh(&mut self) {
        let dirty = std::mem::take(&mut self.dirty);
        self.emit(SessionEvent::Refresh(dirty));
    }

    fn require_user(&self) -> Result<&str> {
        self.user.as_deref().context("Not signed in")
    }

    fn set_status(&self, status: SyncStatus) {
        let _ = self.status.send(status);
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReadingStatus;
    use crate::sync::MemoryRemote;
    use tempfile::TempDir;

    fn fixture() -> (Arc<MemoryRemote>, CacheStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheStore::new(temp_dir.path());
        (Arc::new(MemoryRemote::new()), cache, temp_dir)
    }

    fn book_doc(id: &str, title: &str, date_added: i64) -> (String, serde_json::Value) {
        let mut book = Book::with_id(id, title);
        book.date_added = date_added;
        (id.to_string(), serde_json::to_value(&book).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_in_applies_initial_snapshot() {
        let (remote, cache, _tmp) = fixture();
        remote
            .seed(
                "users/u1/books",
                vec![book_doc("b1", "Dune", 100), book_doc("b2", "Emma", 200)],
            )
            .await;

        let mut session = Session::new(remote.clone(), cache);
        session.sign_in("u1").await.unwrap();

        assert_eq!(session.books().len(), 2);
        // Sorted newest first
        assert_eq!(session.books()[0].title, "Emma");
        assert_eq!(session.status(), SyncStatus::Synced);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_is_full_replace_not_merge() {
        let (remote, cache, _tmp) = fixture();
        remote
            .seed("users/u1/books", vec![book_doc("b1", "Dune", 100)])
            .await;

        let mut session = Session::new(remote.clone(), cache);
        session.sign_in("u1").await.unwrap();
        assert_eq!(session.books().len(), 1);

        // The remote now holds a completely different set
        remote.delete_document("users/u1/books", "b1").await.unwrap();
        let (_, doc) = book_doc("b9", "The Hobbit", 900);
        remote
            .upsert_document("users/u1/books", "b9", doc)
            .await
            .unwrap();
        session.settle().await;

        let titles: Vec<&str> = session.books().iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["The Hobbit"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_book_is_not_optimistic() {
        let (remote, cache, _tmp) = fixture();
        let mut session = Session::new(remote.clone(), cache);
        session.sign_in("u1").await.unwrap();

        let book = Book::new("Dune");
        session.save_book(book).await.unwrap();
        // The snapshot is queued but unapplied: memory is unchanged
        assert!(session.books().is_empty());

        session.settle().await;
        assert_eq!(session.books().len(), 1);
        assert_eq!(session.books()[0].title, "Dune");
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_book_rejects_empty_title() {
        let (remote, cache, _tmp) = fixture();
        let mut session = Session::new(remote.clone(), cache);
        session.sign_in("u1").await.unwrap();

        let err = session.save_book(Book::new("   ")).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::EmptyTitle)
        );
        // Nothing reached the remote
        assert_eq!(remote.write_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_book_applies_via_snapshot() {
        let (remote, cache, _tmp) = fixture();
        remote
            .seed("users/u1/books", vec![book_doc("b1", "Dune", 100)])
            .await;
        let mut session = Session::new(remote.clone(), cache);
        session.sign_in("u1").await.unwrap();

        session.delete_book("b1").await.unwrap();
        session.settle().await;
        assert!(session.books().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_settings_debounce_collapses_to_one_write() {
        let (remote, cache, _tmp) = fixture();
        let mut session = Session::new(remote.clone(), cache);
        session.sign_in("u1").await.unwrap();

        // Five rapid goal changes within the debounce window
        for goal in [10, 20, 30, 40, 50] {
            session.set_goal(goal).unwrap();
        }
        session.settle().await;

        assert_eq!(remote.write_count().await, 1);
        let doc = remote
            .get_document("users/u1/config/settings")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["goal"], 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settings_cache_written_synchronously() {
        let (remote, cache, _tmp) = fixture();
        let mut session = Session::new(remote.clone(), cache.clone());
        session.sign_in("u1").await.unwrap();

        session.set_goal(24).unwrap();
        // Cache reflects the change before the debounced remote write fires
        assert_eq!(cache.load_settings().unwrap().goal, 24);
        assert_eq!(remote.write_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settings_merge_on_sign_in() {
        let (remote, cache, _tmp) = fixture();
        remote
            .seed(
                "users/u1/config",
                vec![(
                    "settings".to_string(),
                    serde_json::json!({"goal": 12, "theme": "rose"}),
                )],
            )
            .await;

        let mut session = Session::new(remote.clone(), cache);
        session.sign_in("u1").await.unwrap();
        assert_eq!(session.settings().goal, 12);
        assert_eq!(session.settings().theme, Theme::Rose);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_out_clears_state() {
        let (remote, cache, _tmp) = fixture();
        remote
            .seed("users/u1/books", vec![book_doc("b1", "Dune", 100)])
            .await;
        let mut session = Session::new(remote.clone(), cache);
        session.sign_in("u1").await.unwrap();
        session.set_display_name("Connie").unwrap();
        assert_eq!(session.books().len(), 1);

        session.sign_out().await;
        assert!(session.books().is_empty());
        assert!(session.collections().is_empty());
        assert_eq!(*session.settings(), Settings::default());
        assert!(session.user().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_users_does_not_leak() {
        let (remote, cache, _tmp) = fixture();
        remote
            .seed("users/u1/books", vec![book_doc("b1", "U1 Book", 100)])
            .await;

        let mut session = Session::new(remote.clone(), cache);
        session.sign_in("u1").await.unwrap();
        assert_eq!(session.books().len(), 1);

        // sign_in tears the previous session down itself
        session.sign_in("u2").await.unwrap();
        assert!(session.books().iter().all(|b| b.title != "U1 Book"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_out_flushes_pending_settings_write() {
        let (remote, cache, _tmp) = fixture();
        let mut session = Session::new(remote.clone(), cache);
        session.sign_in("u1").await.unwrap();

        session.set_goal(42).unwrap();
        session.sign_out().await;

        let doc = remote
            .get_document("users/u1/config/settings")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["goal"], 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_snapshots_coalesce_to_one_refresh() {
        let (remote, cache, _tmp) = fixture();
        let mut session = Session::new(remote.clone(), cache);
        let mut events = session.take_events().unwrap();
        session.sign_in("u1").await.unwrap();
        while events.try_recv().is_ok() {}

        for i in 0..3 {
            let (_, doc) = book_doc(&format!("b{}", i), &format!("Book {}", i), i);
            remote
                .upsert_document("users/u1/books", &format!("b{}", i), doc)
                .await
                .unwrap();
        }
        session.settle().await;

        let mut refreshes = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, SessionEvent::Refresh(_)) {
                refreshes += 1;
            }
        }
        assert_eq!(refreshes, 1);
        // Coalescing loses no state: the final set is all three books
        assert_eq!(session.books().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_write_sets_error_status() {
        let (remote, cache, _tmp) = fixture();
        let mut session = Session::new(remote.clone(), cache);
        let mut events = session.take_events().unwrap();
        session.sign_in("u1").await.unwrap();
        while events.try_recv().is_ok() {}

        remote.set_fail_writes(true).await;
        let result = session.save_book(Book::new("Dune")).await;
        assert!(result.is_err());
        assert_eq!(session.status(), SyncStatus::Error);
        assert!(matches!(
            events.try_recv(),
            Ok(SessionEvent::SyncFailed(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_documents_are_skipped() {
        let (remote, cache, _tmp) = fixture();
        remote
            .seed(
                "users/u1/books",
                vec![
                    book_doc("b1", "Dune", 100),
                    ("bad".to_string(), serde_json::json!(42)),
                ],
            )
            .await;

        let mut session = Session::new(remote.clone(), cache);
        session.sign_in("u1").await.unwrap();
        assert_eq!(session.books().len(), 1);
        assert_eq!(session.books()[0].title, "Dune");
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_mirrors_to_cache() {
        let (remote, cache, _tmp) = fixture();
        remote
            .seed("users/u1/books", vec![book_doc("b1", "Dune", 100)])
            .await;
        let mut session = Session::new(remote.clone(), cache.clone());
        session.sign_in("u1").await.unwrap();

        let cached = cache.load_books().unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].title, "Dune");
    }

    #[tokio::test(start_paused = true)]
    async fn test_boot_from_cache_before_first_snapshot() {
        let (remote, cache, _tmp) = fixture();
        // A previous run left books in the cache
        cache.save_books(&[Book::new("Cached Book")]).unwrap();

        // Subscribing is the first remote contact; before sign_in nothing
        // is loaded
        let mut session = Session::new(remote.clone(), cache);
        assert!(session.books().is_empty());
        session.sign_in("u1").await.unwrap();
        // The empty authoritative snapshot replaced the cached fast-start
        assert!(session.books().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_collection_save_and_dangling_reference() {
        let (remote, cache, _tmp) = fixture();
        let mut session = Session::new(remote.clone(), cache);
        session.sign_in("u1").await.unwrap();

        let collection = Collection::new("Favorites");
        let collection_id = collection.id.clone();
        session.save_collection(collection).await.unwrap();

        let mut book = Book::new("Dune");
        book.collections.push(collection_id.clone());
        book.status = ReadingStatus::Read;
        session.save_book(book).await.unwrap();
        session.settle().await;
        assert_eq!(session.collections().len(), 1);

        // Deleting the collection leaves the book's reference dangling
        session.delete_collection(&collection_id).await.unwrap();
        session.settle().await;
        assert!(session.collections().is_empty());
        assert_eq!(session.books()[0].collections, vec![collection_id]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_collection_rejects_empty_name() {
        let (remote, cache, _tmp) = fixture();
        let mut session = Session::new(remote.clone(), cache);
        session.sign_in("u1").await.unwrap();

        let err = session
            .save_collection(Collection::new(""))
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::EmptyCollectionName)
        );
    }
}
