use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use citizenship_intake::upload::{
    upload_router, FilesystemBlobStore, MemoryBlobStore, UploadError, UploadRelay, UploadRequest,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn request(file: &str, file_name: &str) -> UploadRequest {
    UploadRequest {
        file: Some(file.to_string()),
        file_name: Some(file_name.to_string()),
        client_name: Some("Omar  Haddad".to_string()),
        doc_id: Some("bank_statement".to_string()),
    }
}

#[tokio::test]
async fn relay_stores_decoded_bytes_under_sanitized_path() {
    let store = Arc::new(MemoryBlobStore::default());
    let relay = UploadRelay::new(store.clone());

    let receipt = relay
        .submit(request(&BASE64.encode(b"statement"), "march.final.pdf"))
        .await
        .expect("stored");

    assert!(receipt.path.starts_with("Omar-Haddad/bank_statement-"));
    assert!(receipt.path.ends_with(".pdf"));
    assert_eq!(receipt.size, 9);
    assert_eq!(receipt.file_name, "march.final.pdf");
    assert_eq!(store.get(&receipt.path).as_deref(), Some(&b"statement"[..]));
}

#[tokio::test]
async fn relay_rejects_payloads_over_the_limit() {
    let store = Arc::new(MemoryBlobStore::default());
    let relay = UploadRelay::with_limit(store.clone(), 4);

    let result = relay
        .submit(request(&BASE64.encode(b"too long"), "a.pdf"))
        .await;

    assert!(matches!(
        result,
        Err(UploadError::TooLarge { size: 8, limit: 4 })
    ));
    assert!(store.paths().is_empty());
}

#[tokio::test]
async fn relay_treats_empty_fields_as_missing() {
    let relay = UploadRelay::new(Arc::new(MemoryBlobStore::default()));
    let mut incomplete = request("", "a.pdf");
    incomplete.doc_id = None;

    assert!(matches!(
        relay.submit(incomplete).await,
        Err(UploadError::MissingFields)
    ));
}

#[tokio::test]
async fn upload_endpoint_writes_to_filesystem() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = Arc::new(FilesystemBlobStore::new(dir.path(), "http://127.0.0.1:3000/files"));
    let router = upload_router(Arc::new(UploadRelay::new(store)));

    let body = json!({
        "file": BASE64.encode(b"0123456789"),
        "fileName": "statement.pdf",
        "clientName": "Omar Haddad",
        "docId": "bank_statement",
    });
    let response = router
        .oneshot(
            Request::post("/api/upload")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    let payload: Value = serde_json::from_slice(&bytes).expect("json payload");
    assert_eq!(payload["success"], json!(true));
    assert_eq!(payload["size"], json!(10));
    assert_eq!(payload["fileName"], json!("statement.pdf"));

    let url = payload["url"].as_str().expect("url");
    let relative = url
        .strip_prefix("http://127.0.0.1:3000/files/")
        .expect("url under public base");
    let stored = std::fs::read(dir.path().join(relative)).expect("file on disk");
    assert_eq!(stored, b"0123456789");
}

#[tokio::test]
async fn upload_endpoint_answers_oversized_payloads_with_413() {
    let router = upload_router(Arc::new(UploadRelay::with_limit(
        Arc::new(MemoryBlobStore::default()),
        4,
    )));

    let body = json!({
        "file": BASE64.encode(b"0123456789"),
        "fileName": "statement.pdf",
        "clientName": "Omar Haddad",
        "docId": "bank_statement",
    });
    let response = router
        .oneshot(
            Request::post("/api/upload")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
