//! Hierarchical document storage.
//!
//! Documents live at paths of alternating collection and document ids
//! (`users/{uid}/colleges/{cid}`). Stores implement [`DocumentStore`];
//! live listeners are served by a [`SubscriptionHub`] that each store feeds
//! after every committed write.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

use super::appwrite::AppwriteDocumentStore;
use super::error::BackendError;

/// Field map of one stored document
pub type Document = serde_json::Map<String, Value>;

/// Full contents of a collection at one point in commit order
pub type Snapshot = Vec<StoredDocument>;

pub type SnapshotCallback = Box<dyn Fn(Snapshot) + Send + Sync + 'static>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredDocument {
    pub id: String,
    pub data: Document,
}

fn check_segment(segment: &str) -> Result<String, BackendError> {
    if segment.is_empty() || segment.contains('/') || segment == "." || segment == ".." {
        return Err(BackendError::InvalidPath(segment.to_string()));
    }
    Ok(segment.to_string())
}

/// Path to a collection: an odd number of segments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    segments: Vec<String>,
}

impl CollectionPath {
    pub fn root(name: &str) -> Result<Self, BackendError> {
        Ok(Self {
            segments: vec![check_segment(name)?],
        })
    }

    pub fn parse(raw: &str) -> Result<Self, BackendError> {
        let segments = raw
            .trim_matches('/')
            .split('/')
            .map(check_segment)
            .collect::<Result<Vec<_>, _>>()?;
        if segments.len() % 2 == 0 {
            return Err(BackendError::InvalidPath(raw.to_string()));
        }
        Ok(Self { segments })
    }

    pub fn doc(&self, id: &str) -> Result<DocumentPath, BackendError> {
        let mut segments = self.segments.clone();
        segments.push(check_segment(id)?);
        Ok(DocumentPath { segments })
    }

    pub fn id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn key(&self) -> String {
        self.segments.join("/")
    }
}

impl std::fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

/// Path to a single document: an even number of segments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    segments: Vec<String>,
}

impl DocumentPath {
    pub fn parse(raw: &str) -> Result<Self, BackendError> {
        let segments = raw
            .trim_matches('/')
            .split('/')
            .map(check_segment)
            .collect::<Result<Vec<_>, _>>()?;
        if segments.len() % 2 != 0 {
            return Err(BackendError::InvalidPath(raw.to_string()));
        }
        Ok(Self { segments })
    }

    pub fn collection(&self, name: &str) -> Result<CollectionPath, BackendError> {
        let mut segments = self.segments.clone();
        segments.push(check_segment(name)?);
        Ok(CollectionPath { segments })
    }

    pub fn parent(&self) -> CollectionPath {
        CollectionPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        }
    }

    pub fn id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn key(&self) -> String {
        self.segments.join("/")
    }
}

impl std::fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

/// Path layout of the tracker's documents
pub mod paths {
    use super::{CollectionPath, DocumentPath};
    use crate::models::AppPlatform;
    use crate::services::error::BackendError;

    /// Sign-in records, one per account uid
    pub fn accounts() -> Result<CollectionPath, BackendError> {
        CollectionPath::root("accounts")
    }

    pub fn account(uid: &str) -> Result<DocumentPath, BackendError> {
        accounts()?.doc(uid)
    }

    pub fn users() -> Result<CollectionPath, BackendError> {
        CollectionPath::root("users")
    }

    pub fn user(uid: &str) -> Result<DocumentPath, BackendError> {
        users()?.doc(uid)
    }

    pub fn colleges(uid: &str) -> Result<CollectionPath, BackendError> {
        user(uid)?.collection("colleges")
    }

    pub fn college(uid: &str, college_id: &str) -> Result<DocumentPath, BackendError> {
        colleges(uid)?.doc(college_id)
    }

    pub fn essays(uid: &str, college_id: &str) -> Result<CollectionPath, BackendError> {
        college(uid, college_id)?.collection("essays")
    }

    pub fn essay(uid: &str, college_id: &str, essay_id: &str) -> Result<DocumentPath, BackendError> {
        essays(uid, college_id)?.doc(essay_id)
    }

    pub fn activities(uid: &str, platform: AppPlatform) -> Result<CollectionPath, BackendError> {
        user(uid)?
            .collection("activityLists")?
            .doc(platform.as_str())?
            .collection("activities")
    }

    pub fn activity(uid: &str, platform: AppPlatform, activity_id: &str) -> Result<DocumentPath, BackendError> {
        activities(uid, platform)?.doc(activity_id)
    }
}

/// Storage collaborator for the tracker
pub trait DocumentStore: Send + Sync + 'static {
    /// Create or fully replace a document
    fn set(&self, path: &DocumentPath, data: Document) -> impl Future<Output = Result<(), BackendError>> + Send;

    fn get(&self, path: &DocumentPath) -> impl Future<Output = Result<Option<Document>, BackendError>> + Send;

    /// Merge `fields` into an existing document; missing documents are `NotFound`
    fn update(&self, path: &DocumentPath, fields: Document) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Deleting a missing document is not an error
    fn delete(&self, path: &DocumentPath) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Direct children of a collection, ordered by id
    fn list(&self, collection: &CollectionPath) -> impl Future<Output = Result<Snapshot, BackendError>> + Send;

    /// Deliver the current snapshot, then one per committed write, until the
    /// returned subscription is stopped or dropped
    fn subscribe(
        &self,
        collection: &CollectionPath,
        callback: SnapshotCallback,
    ) -> impl Future<Output = Result<Subscription, BackendError>> + Send;
}

struct Listener {
    id: u64,
    tx: mpsc::UnboundedSender<Snapshot>,
}

#[derive(Default)]
struct HubInner {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<String, Vec<Listener>>>,
}

impl HubInner {
    fn remove(&self, collection: &str, id: u64) {
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(list) = listeners.get_mut(collection) {
            list.retain(|l| l.id != id);
            if list.is_empty() {
                listeners.remove(collection);
            }
        }
    }
}

/// Fan-out of collection snapshots to live listeners
#[derive(Clone, Default)]
pub struct SubscriptionHub {
    inner: Arc<HubInner>,
}

impl SubscriptionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_listeners(&self, collection: &CollectionPath) -> bool {
        let listeners = self.inner.listeners.lock().unwrap_or_else(|e| e.into_inner());
        listeners.contains_key(&collection.key())
    }

    pub fn listener_count(&self) -> usize {
        let listeners = self.inner.listeners.lock().unwrap_or_else(|e| e.into_inner());
        listeners.values().map(Vec::len).sum()
    }

    /// Queue a snapshot for every listener on `collection`.
    ///
    /// Callers publish while still holding their write lock so listeners
    /// observe snapshots in commit order.
    pub fn publish(&self, collection: &CollectionPath, snapshot: &Snapshot) {
        let mut listeners = self.inner.listeners.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(list) = listeners.get_mut(&collection.key()) {
            // Closed receivers belong to finished tasks
            list.retain(|l| l.tx.send(snapshot.clone()).is_ok());
        }
    }

    /// Must be called from within a tokio runtime
    pub fn register(&self, collection: &CollectionPath, initial: Snapshot, callback: SnapshotCallback) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, mut rx) = mpsc::unbounded_channel::<Snapshot>();
        // Cannot fail: the receiver is still in scope
        let _ = tx.send(initial);

        {
            let mut listeners = self.inner.listeners.lock().unwrap_or_else(|e| e.into_inner());
            listeners.entry(collection.key()).or_default().push(Listener { id, tx });
        }

        let task = tokio::spawn(async move {
            while let Some(snapshot) = rx.recv().await {
                callback(snapshot);
            }
        });

        tracing::debug!("Subscribed listener {} to {}", id, collection);

        Subscription {
            id,
            collection: collection.key(),
            hub: Arc::downgrade(&self.inner),
            task: Some(task),
        }
    }
}

/// Live collection listener. Stops on [`Subscription::stop`] or drop.
pub struct Subscription {
    id: u64,
    collection: String,
    hub: Weak<HubInner>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            if let Some(hub) = self.hub.upgrade() {
                hub.remove(&self.collection, self.id);
            }
            task.abort();
            tracing::debug!("Stopped listener {} on {}", self.id, self.collection);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("collection", &self.collection)
            .finish()
    }
}

type Collections = BTreeMap<String, BTreeMap<String, Document>>;

/// In-process store used for development and tests
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<RwLock<Collections>>,
    hub: SubscriptionHub,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hub(&self) -> &SubscriptionHub {
        &self.hub
    }

    fn snapshot(collections: &Collections, collection: &str) -> Snapshot {
        collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| StoredDocument {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn publish_locked(&self, collections: &Collections, parent: &CollectionPath) {
        if self.hub.has_listeners(parent) {
            self.hub.publish(parent, &Self::snapshot(collections, &parent.key()));
        }
    }
}

impl DocumentStore for MemoryDocumentStore {
    async fn set(&self, path: &DocumentPath, data: Document) -> Result<(), BackendError> {
        let parent = path.parent();
        let mut collections = self.collections.write().await;
        collections
            .entry(parent.key())
            .or_default()
            .insert(path.id().to_string(), data);
        self.publish_locked(&collections, &parent);
        Ok(())
    }

    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, BackendError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&path.parent().key())
            .and_then(|docs| docs.get(path.id()))
            .cloned())
    }

    async fn update(&self, path: &DocumentPath, fields: Document) -> Result<(), BackendError> {
        let parent = path.parent();
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(&parent.key())
            .and_then(|docs| docs.get_mut(path.id()))
            .ok_or_else(|| BackendError::NotFound(path.key()))?;
        doc.extend(fields);
        self.publish_locked(&collections, &parent);
        Ok(())
    }

    async fn delete(&self, path: &DocumentPath) -> Result<(), BackendError> {
        let parent = path.parent();
        let mut collections = self.collections.write().await;
        let removed = collections
            .get_mut(&parent.key())
            .and_then(|docs| docs.remove(path.id()))
            .is_some();
        if removed {
            self.publish_locked(&collections, &parent);
        }
        Ok(())
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Snapshot, BackendError> {
        let collections = self.collections.read().await;
        Ok(Self::snapshot(&collections, &collection.key()))
    }

    async fn subscribe(
        &self,
        collection: &CollectionPath,
        callback: SnapshotCallback,
    ) -> Result<Subscription, BackendError> {
        // Holding the read lock keeps writes from slipping between snapshot and registration
        let collections = self.collections.read().await;
        let initial = Self::snapshot(&collections, &collection.key());
        Ok(self.hub.register(collection, initial, callback))
    }
}

/// Store selected at startup
#[derive(Clone)]
pub enum DocumentBackend {
    Memory(MemoryDocumentStore),
    Appwrite(AppwriteDocumentStore),
}

impl DocumentStore for DocumentBackend {
    async fn set(&self, path: &DocumentPath, data: Document) -> Result<(), BackendError> {
        match self {
            DocumentBackend::Memory(store) => store.set(path, data).await,
            DocumentBackend::Appwrite(store) => store.set(path, data).await,
        }
    }

    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, BackendError> {
        match self {
            DocumentBackend::Memory(store) => store.get(path).await,
            DocumentBackend::Appwrite(store) => store.get(path).await,
        }
    }

    async fn update(&self, path: &DocumentPath, fields: Document) -> Result<(), BackendError> {
        match self {
            DocumentBackend::Memory(store) => store.update(path, fields).await,
            DocumentBackend::Appwrite(store) => store.update(path, fields).await,
        }
    }

    async fn delete(&self, path: &DocumentPath) -> Result<(), BackendError> {
        match self {
            DocumentBackend::Memory(store) => store.delete(path).await,
            DocumentBackend::Appwrite(store) => store.delete(path).await,
        }
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Snapshot, BackendError> {
        match self {
            DocumentBackend::Memory(store) => store.list(collection).await,
            DocumentBackend::Appwrite(store) => store.list(collection).await,
        }
    }

    async fn subscribe(
        &self,
        collection: &CollectionPath,
        callback: SnapshotCallback,
    ) -> Result<Subscription, BackendError> {
        match self {
            DocumentBackend::Memory(store) => store.subscribe(collection, callback).await,
            DocumentBackend::Appwrite(store) => store.subscribe(collection, callback).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppPlatform;
    use serde_json::json;
    use std::time::Duration;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_path_layout() {
        assert_eq!(paths::user("u1").unwrap().key(), "users/u1");
        assert_eq!(paths::essay("u1", "mit", "e1").unwrap().key(), "users/u1/colleges/mit/essays/e1");
        assert_eq!(
            paths::activity("u1", AppPlatform::CommonApp, "a1").unwrap().key(),
            "users/u1/activityLists/commonApp/activities/a1"
        );
        assert_eq!(paths::college("u1", "mit").unwrap().parent().key(), "users/u1/colleges");
    }

    #[test]
    fn test_invalid_paths_rejected() {
        assert!(paths::college("u1", "").is_err());
        assert!(paths::college("u1", "a/b").is_err());
        assert!(DocumentPath::parse("users").is_err());
        assert!(CollectionPath::parse("users/u1").is_err());
        assert_eq!(DocumentPath::parse("/users/u1/").unwrap().id(), "u1");
    }

    #[tokio::test]
    async fn test_set_get_update_delete() {
        let store = MemoryDocumentStore::new();
        let path = paths::user("u1").unwrap();

        assert!(store.get(&path).await.unwrap().is_none());
        store.set(&path, doc(json!({"a": 1, "b": 2}))).await.unwrap();
        store.update(&path, doc(json!({"b": 3, "c": 4}))).await.unwrap();

        let stored = store.get(&path).await.unwrap().unwrap();
        assert_eq!(Value::Object(stored), json!({"a": 1, "b": 3, "c": 4}));

        store.delete(&path).await.unwrap();
        assert!(store.get(&path).await.unwrap().is_none());
        store.delete(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryDocumentStore::new();
        let err = store
            .update(&paths::user("ghost").unwrap(), Document::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_direct_children_only() {
        let store = MemoryDocumentStore::new();
        store.set(&paths::college("u1", "mit").unwrap(), doc(json!({"name": "MIT"}))).await.unwrap();
        store.set(&paths::college("u1", "duke").unwrap(), doc(json!({"name": "Duke"}))).await.unwrap();
        store.set(&paths::essay("u1", "mit", "e1").unwrap(), doc(json!({"title": "x"}))).await.unwrap();

        let colleges = store.list(&paths::colleges("u1").unwrap()).await.unwrap();
        let ids: Vec<&str> = colleges.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["duke", "mit"]);
    }

    #[tokio::test]
    async fn test_subscription_delivers_in_order_until_stopped() {
        let store = MemoryDocumentStore::new();
        let collection = paths::colleges("u1").unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel::<usize>();

        let subscription = store
            .subscribe(&collection, Box::new(move |snapshot| {
                let _ = tx.send(snapshot.len());
            }))
            .await
            .unwrap();

        store.set(&collection.doc("a").unwrap(), Document::new()).await.unwrap();
        store.set(&collection.doc("b").unwrap(), Document::new()).await.unwrap();
        store.delete(&collection.doc("a").unwrap()).await.unwrap();

        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap());
        }
        assert_eq!(seen, vec![0, 1, 2, 1]);

        assert_eq!(store.hub().listener_count(), 1);
        subscription.stop();
        assert_eq!(store.hub().listener_count(), 0);

        store.set(&collection.doc("c").unwrap(), Document::new()).await.unwrap();
        let after = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(!matches!(after, Ok(Some(_))));
    }

    #[tokio::test]
    async fn test_dropping_subscription_unregisters() {
        let store = MemoryDocumentStore::new();
        let collection = paths::colleges("u1").unwrap();
        {
            let _subscription = store.subscribe(&collection, Box::new(|_| {})).await.unwrap();
            assert!(store.hub().has_listeners(&collection));
        }
        assert!(!store.hub().has_listeners(&collection));
    }
}
