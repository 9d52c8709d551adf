// Service exports
pub mod appwrite;
pub mod documents;
pub mod error;
pub mod identity;
pub mod tracker;

pub use appwrite::AppwriteDocumentStore;
pub use documents::{
    paths, CollectionPath, Document, DocumentBackend, DocumentPath, DocumentStore, MemoryDocumentStore, Snapshot,
    SnapshotCallback, StoredDocument, Subscription, SubscriptionHub,
};
pub use error::{user_message, AuthErrorCode, BackendError};
pub use identity::{DocumentIdentityProvider, IdentityProvider, IssuedSession, Session, SessionUser};
pub use tracker::{Tracker, TrackerError};
