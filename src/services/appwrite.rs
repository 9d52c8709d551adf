use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::documents::{
    CollectionPath, Document, DocumentPath, DocumentStore, Snapshot, SnapshotCallback, StoredDocument,
    Subscription, SubscriptionHub,
};
use super::error::BackendError;
use crate::config::BackendSettings;

/// Appwrite ids are limited to 36 characters
const DOCUMENT_ID_LEN: usize = 36;
const LIST_LIMIT: u32 = 5000;

#[derive(Debug)]
struct Endpoint {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    collection_id: String,
}

/// Document store backed by a single Appwrite collection
///
/// Appwrite collections are flat, so every tracker document is stored in one
/// collection with three string attributes:
/// - `path`: full document path (`users/u1/colleges/mit`)
/// - `parentPath`: path of the containing collection, used for listing
/// - `data`: JSON-encoded document fields
///
/// Document ids are the first 36 hex characters of the SHA-256 of the path.
/// Subscriptions only observe writes made through this process.
#[derive(Clone)]
pub struct AppwriteDocumentStore {
    endpoint: Arc<Endpoint>,
    client: Client,
    hub: SubscriptionHub,
    publish_lock: Arc<Mutex<()>>,
}

impl AppwriteDocumentStore {
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collection_id: String,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint: Arc::new(Endpoint {
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key,
                project_id,
                database_id,
                collection_id,
            }),
            client,
            hub: SubscriptionHub::new(),
            publish_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn from_settings(settings: &BackendSettings) -> Result<Self, BackendError> {
        Self::new(
            settings.endpoint.clone(),
            settings.api_key.clone(),
            settings.project_id.clone(),
            settings.database_id.clone(),
            settings.collection_id.clone(),
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    pub fn hub(&self) -> &SubscriptionHub {
        &self.hub
    }

    /// Deterministic Appwrite document id for a path
    pub fn document_id(path: &DocumentPath) -> String {
        let digest = Sha256::digest(path.key().as_bytes());
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        hex[..DOCUMENT_ID_LEN].to_string()
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.endpoint.base_url, self.endpoint.database_id, self.endpoint.collection_id
        )
    }

    fn document_url(&self, path: &DocumentPath) -> String {
        format!("{}/{}", self.documents_url(), Self::document_id(path))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("X-Appwrite-Key", &self.endpoint.api_key)
            .header("X-Appwrite-Project", &self.endpoint.project_id)
    }

    async fn check(response: Response, action: &str) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read body".to_string());
        tracing::error!("Appwrite {} failed: {} - {}", action, status, body);

        Err(BackendError::Api {
            status: status.as_u16(),
            message: format!("Failed to {}: {}", action, status),
        })
    }

    fn attributes(path: &DocumentPath, data: &Document) -> Result<Value, BackendError> {
        Ok(json!({
            "path": path.key(),
            "parentPath": path.parent().key(),
            "data": serde_json::to_string(data)?,
        }))
    }

    fn decode(doc: &Value) -> Result<StoredDocument, BackendError> {
        let path = doc
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| BackendError::InvalidResponse("Missing path attribute".into()))?;
        let path = DocumentPath::parse(path)?;

        let data = match doc.get("data") {
            Some(Value::String(raw)) => serde_json::from_str(raw)?,
            Some(Value::Object(map)) => map.clone(),
            _ => return Err(BackendError::InvalidResponse("Missing data attribute".into())),
        };

        Ok(StoredDocument {
            id: path.id().to_string(),
            data,
        })
    }

    async fn write_document(&self, path: &DocumentPath, data: &Document) -> Result<(), BackendError> {
        let attributes = Self::attributes(path, data)?;

        let response = self
            .request(Method::PATCH, &self.document_url(path))
            .json(&json!({ "data": attributes }))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            let response = self
                .request(Method::POST, &self.documents_url())
                .json(&json!({
                    "documentId": Self::document_id(path),
                    "data": attributes,
                }))
                .send()
                .await?;
            Self::check(response, "create document").await?;
        } else {
            Self::check(response, "write document").await?;
        }

        tracing::debug!("Wrote document {}", path);
        Ok(())
    }

    /// Run a write and, when someone is listening, publish the new snapshot.
    /// Writes to watched collections are serialized so snapshots follow commit order.
    async fn committed<F>(&self, parent: &CollectionPath, write: F) -> Result<(), BackendError>
    where
        F: std::future::Future<Output = Result<(), BackendError>> + Send,
    {
        if !self.hub.has_listeners(parent) {
            return write.await;
        }

        let _guard = self.publish_lock.lock().await;
        write.await?;
        let snapshot = self.list(parent).await?;
        self.hub.publish(parent, &snapshot);
        Ok(())
    }
}

impl DocumentStore for AppwriteDocumentStore {
    async fn set(&self, path: &DocumentPath, data: Document) -> Result<(), BackendError> {
        self.committed(&path.parent(), self.write_document(path, &data)).await
    }

    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, BackendError> {
        let response = self
            .request(Method::GET, &self.document_url(path))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let json: Value = Self::check(response, "fetch document").await?.json().await?;
        Ok(Some(Self::decode(&json)?.data))
    }

    async fn update(&self, path: &DocumentPath, fields: Document) -> Result<(), BackendError> {
        let mut current = self
            .get(path)
            .await?
            .ok_or_else(|| BackendError::NotFound(path.key()))?;
        current.extend(fields);
        self.committed(&path.parent(), self.write_document(path, &current)).await
    }

    async fn delete(&self, path: &DocumentPath) -> Result<(), BackendError> {
        let delete = async {
            let response = self
                .request(Method::DELETE, &self.document_url(path))
                .send()
                .await?;
            if response.status() != StatusCode::NOT_FOUND {
                Self::check(response, "delete document").await?;
            }
            tracing::debug!("Deleted document {}", path);
            Ok::<(), BackendError>(())
        };
        self.committed(&path.parent(), delete).await
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Snapshot, BackendError> {
        let queries = [
            json!({"method": "equal", "attribute": "parentPath", "values": [collection.key()]}),
            json!({"method": "limit", "values": [LIST_LIMIT]}),
        ];
        let query_string = queries
            .iter()
            .map(|q| format!("queries[]={}", urlencoding::encode(&q.to_string())))
            .collect::<Vec<_>>()
            .join("&");
        let url = format!("{}?{}", self.documents_url(), query_string);

        let response = self.request(Method::GET, &url).send().await?;
        let json: Value = Self::check(response, "list documents").await?.json().await?;

        let documents = json
            .get("documents")
            .and_then(|d| d.as_array())
            .ok_or_else(|| BackendError::InvalidResponse("Missing documents array".into()))?;

        let mut snapshot = documents
            .iter()
            .map(Self::decode)
            .collect::<Result<Snapshot, _>>()?;
        snapshot.sort_by(|a, b| a.id.cmp(&b.id));

        tracing::debug!("Listed {} documents under {}", snapshot.len(), collection);
        Ok(snapshot)
    }

    async fn subscribe(
        &self,
        collection: &CollectionPath,
        callback: SnapshotCallback,
    ) -> Result<Subscription, BackendError> {
        let _guard = self.publish_lock.lock().await;
        let initial = self.list(collection).await?;
        Ok(self.hub.register(collection, initial, callback))
    }
}
