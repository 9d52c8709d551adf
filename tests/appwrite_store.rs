// Appwrite document store tests against a mock server

use std::time::Duration;

use mockito::{Matcher, Server};
use serde_json::json;
use sunrise::services::{paths, AppwriteDocumentStore, BackendError, Document, DocumentStore};

const DOCUMENTS: &str = "/databases/test_db/collections/documents/documents";

fn store(url: String) -> AppwriteDocumentStore {
    AppwriteDocumentStore::new(
        url,
        "test_key".to_string(),
        "test_project".to_string(),
        "test_db".to_string(),
        "documents".to_string(),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn document_url(path: &sunrise::services::DocumentPath) -> String {
    format!("{}/{}", DOCUMENTS, AppwriteDocumentStore::document_id(path))
}

#[tokio::test]
async fn test_get_decodes_stored_json() {
    let mut server = Server::new_async().await;
    let path = paths::college("u1", "mit").unwrap();

    let mock = server
        .mock("GET", document_url(&path).as_str())
        .match_header("X-Appwrite-Key", "test_key")
        .match_header("X-Appwrite-Project", "test_project")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "$id": AppwriteDocumentStore::document_id(&path),
                "path": "users/u1/colleges/mit",
                "parentPath": "users/u1/colleges",
                "data": "{\"name\":\"Massachusetts Institute of Technology\"}"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let doc = store(server.url()).get(&path).await.unwrap().unwrap();
    assert_eq!(doc["name"], "Massachusetts Institute of Technology");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_missing_is_none() {
    let mut server = Server::new_async().await;
    let path = paths::user("ghost").unwrap();

    server
        .mock("GET", document_url(&path).as_str())
        .with_status(404)
        .with_body(r#"{"message":"Document not found"}"#)
        .create_async()
        .await;

    assert!(store(server.url()).get(&path).await.unwrap().is_none());
}

#[tokio::test]
async fn test_set_creates_when_patch_misses() {
    let mut server = Server::new_async().await;
    let path = paths::essay("u1", "mit", "e1").unwrap();

    let patch = server
        .mock("PATCH", document_url(&path).as_str())
        .with_status(404)
        .create_async()
        .await;
    let post = server
        .mock("POST", DOCUMENTS)
        .match_body(Matcher::PartialJson(json!({
            "documentId": AppwriteDocumentStore::document_id(&path),
            "data": { "path": "users/u1/colleges/mit/essays/e1", "parentPath": "users/u1/colleges/mit/essays" }
        })))
        .with_status(201)
        .with_body("{}")
        .create_async()
        .await;

    let mut data = Document::new();
    data.insert("title".into(), json!("Why MIT"));
    store(server.url()).set(&path, data).await.unwrap();

    patch.assert_async().await;
    post.assert_async().await;
}

#[tokio::test]
async fn test_list_filters_by_parent_and_sorts() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", DOCUMENTS)
        .match_query(Matcher::Regex("parentPath".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "total": 2,
                "documents": [
                    { "path": "users/u1/colleges/stanford-university", "data": "{\"name\":\"Stanford\"}" },
                    { "path": "users/u1/colleges/duke-university", "data": "{\"name\":\"Duke\"}" }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let snapshot = store(server.url()).list(&paths::colleges("u1").unwrap()).await.unwrap();
    let ids: Vec<&str> = snapshot.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["duke-university", "stanford-university"]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_errors_surface_status() {
    let mut server = Server::new_async().await;
    let path = paths::user("u1").unwrap();

    server
        .mock("GET", document_url(&path).as_str())
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    match store(server.url()).get(&path).await {
        Err(BackendError::Api { status, .. }) => assert_eq!(status, 500),
        other => panic!("expected an API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_delete_missing_is_ok() {
    let mut server = Server::new_async().await;
    let path = paths::activity("u1", sunrise::models::AppPlatform::Uc, "a1").unwrap();

    let mock = server
        .mock("DELETE", document_url(&path).as_str())
        .with_status(404)
        .create_async()
        .await;

    store(server.url()).delete(&path).await.unwrap();
    mock.assert_async().await;
}
