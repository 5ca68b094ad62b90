use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::error;

use super::relay::{UploadError, UploadReceipt, UploadRelay, UploadRequest};
use super::storage::BlobStore;
use crate::config::request_body_limit;

/// Router exposing `POST /api/upload`. Other methods answer 405 with a JSON body.
pub fn upload_router<S>(relay: Arc<UploadRelay<S>>) -> Router
where
    S: BlobStore + 'static,
{
    let body_limit = request_body_limit(relay.max_bytes());

    Router::new()
        .route(
            "/api/upload",
            post(upload_handler::<S>).fallback(method_not_allowed),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(relay)
}

pub(crate) async fn upload_handler<S>(
    State(relay): State<Arc<UploadRelay<S>>>,
    body: Result<Bytes, BytesRejection>,
) -> Response
where
    S: BlobStore + 'static,
{
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return body_rejection_response(rejection),
    };

    match relay.submit(upload_request_from_body(&body)).await {
        Ok(receipt) => (StatusCode::OK, Json(success_body(&receipt))).into_response(),
        Err(err) => upload_error_response(err),
    }
}

/// Read the upload fields out of a raw body. Anything that is not a JSON
/// object with string values leaves the affected fields unset, which the
/// relay reports as missing.
pub(crate) fn upload_request_from_body(body: &[u8]) -> UploadRequest {
    let value = parse_body(body);
    UploadRequest {
        file: string_field(&value, &["file"]),
        file_name: string_field(&value, &["fileName"]),
        client_name: string_field(&value, &["clientName"]),
        doc_id: string_field(&value, &["docId"]),
    }
}

pub(crate) fn parse_body(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

/// First of `names` present on `value` as a string.
pub(crate) fn string_field(value: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| value.get(*name).and_then(Value::as_str))
        .map(str::to_string)
}

/// Over-limit bodies keep their 413; any other unreadable body counts as
/// missing fields.
pub(crate) fn body_rejection_response(rejection: BytesRejection) -> Response {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(json!({ "error": "File too large", "message": rejection.body_text() })),
        )
            .into_response();
    }
    upload_error_response(UploadError::MissingFields)
}

pub(crate) async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
        .into_response()
}

pub(crate) fn success_body(receipt: &UploadReceipt) -> serde_json::Value {
    json!({
        "success": true,
        "url": receipt.url,
        "fileName": receipt.file_name,
        "size": receipt.size,
        "uploadedAt": receipt.uploaded_at,
    })
}

/// Map relay failures to the response contract shared by every upload endpoint.
pub fn upload_error_response(err: UploadError) -> Response {
    let (status, body) = match &err {
        UploadError::MissingFields => (
            StatusCode::BAD_REQUEST,
            json!({ "error": "Missing required fields" }),
        ),
        UploadError::Decoding(message) => (
            StatusCode::BAD_REQUEST,
            json!({ "error": "Invalid file encoding", "message": message }),
        ),
        UploadError::TooLarge { .. } => (
            StatusCode::PAYLOAD_TOO_LARGE,
            json!({ "error": "File too large", "message": err.to_string() }),
        ),
        UploadError::Failed(message) => {
            error!(error = %message, "upload failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Upload failed", "message": message }),
            )
        }
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::storage::MemoryBlobStore;
    use axum::body::Body;
    use axum::http::{header, Request};
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use serde_json::Value;
    use tower::ServiceExt;

    fn router(store: Arc<MemoryBlobStore>) -> Router {
        upload_router(Arc::new(UploadRelay::new(store)))
    }

    async fn read_json_body(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    fn post_json(body: Value) -> Request<Body> {
        Request::post("/api/upload")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds")
    }

    #[tokio::test]
    async fn post_stores_file_and_reports_size() {
        let store = Arc::new(MemoryBlobStore::default());
        let response = router(store.clone())
            .oneshot(post_json(json!({
                "file": BASE64.encode(b"0123456789"),
                "fileName": "a.pdf",
                "clientName": "Jane Doe",
                "docId": "passport_bio",
            })))
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json_body(response).await;
        assert_eq!(payload["success"], json!(true));
        assert_eq!(payload["size"], json!(10));
        assert_eq!(payload["fileName"], json!("a.pdf"));
        assert!(payload["uploadedAt"].is_string());
        let url = payload["url"].as_str().expect("url");
        assert!(url.starts_with("memory://Jane-Doe/passport_bio-"));
        assert!(url.ends_with(".pdf"));
        assert_eq!(store.paths().len(), 1);
    }

    #[tokio::test]
    async fn get_is_method_not_allowed() {
        let response = router(Arc::new(MemoryBlobStore::default()))
            .oneshot(
                Request::get("/api/upload")
                    .body(Body::from("{\"file\":\"x\"}"))
                    .expect("request builds"),
            )
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let payload = read_json_body(response).await;
        assert_eq!(payload, json!({ "error": "Method not allowed" }));
    }

    #[tokio::test]
    async fn missing_fields_are_a_bad_request() {
        let response = router(Arc::new(MemoryBlobStore::default()))
            .oneshot(post_json(json!({ "fileName": "a.pdf" })))
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let payload = read_json_body(response).await;
        assert_eq!(payload, json!({ "error": "Missing required fields" }));
    }

    #[tokio::test]
    async fn malformed_base64_is_reported() {
        let response = router(Arc::new(MemoryBlobStore::default()))
            .oneshot(post_json(json!({
                "file": "%%%",
                "fileName": "a.pdf",
                "clientName": "Jane Doe",
                "docId": "passport_bio",
            })))
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let payload = read_json_body(response).await;
        assert_eq!(payload["error"], json!("Invalid file encoding"));
    }

    #[tokio::test]
    async fn empty_body_without_content_type_is_missing_fields() {
        let response = router(Arc::new(MemoryBlobStore::default()))
            .oneshot(
                Request::post("/api/upload")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let payload = read_json_body(response).await;
        assert_eq!(payload, json!({ "error": "Missing required fields" }));
    }

    #[tokio::test]
    async fn non_json_body_is_missing_fields() {
        let response = router(Arc::new(MemoryBlobStore::default()))
            .oneshot(
                Request::post("/api/upload")
                    .header(header::CONTENT_TYPE, "text/plain")
                    .body(Body::from("file=abc&fileName=a.pdf"))
                    .expect("request builds"),
            )
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let payload = read_json_body(response).await;
        assert_eq!(payload, json!({ "error": "Missing required fields" }));
    }

    #[tokio::test]
    async fn non_string_fields_are_missing_fields() {
        let store = Arc::new(MemoryBlobStore::default());
        let response = router(store.clone())
            .oneshot(post_json(json!({
                "file": 5,
                "fileName": "a.pdf",
                "clientName": "Jane Doe",
                "docId": "passport_bio",
            })))
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let payload = read_json_body(response).await;
        assert_eq!(payload, json!({ "error": "Missing required fields" }));
        assert!(store.paths().is_empty());
    }

    #[tokio::test]
    async fn body_over_request_limit_is_too_large() {
        let relay = Arc::new(UploadRelay::with_limit(Arc::new(MemoryBlobStore::default()), 4));
        let oversized = "A".repeat(request_body_limit(4) + 1);
        let response = upload_router(relay)
            .oneshot(post_json(json!({
                "file": oversized,
                "fileName": "a.pdf",
                "clientName": "Jane Doe",
                "docId": "passport_bio",
            })))
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let payload = read_json_body(response).await;
        assert_eq!(payload["error"], json!("File too large"));
    }

    #[test]
    fn body_fields_are_read_leniently() {
        let request = upload_request_from_body(br#"{"file":"QUJD","fileName":7,"docId":"x"}"#);
        assert_eq!(request.file.as_deref(), Some("QUJD"));
        assert_eq!(request.file_name, None);
        assert_eq!(request.client_name, None);
        assert_eq!(request.doc_id.as_deref(), Some("x"));
        assert_eq!(upload_request_from_body(b"[1, 2]"), UploadRequest::default());
        assert_eq!(upload_request_from_body(b""), UploadRequest::default());
    }

    #[test]
    fn storage_failures_map_to_internal_error() {
        let response = upload_error_response(UploadError::Failed("disk full".to_string()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
