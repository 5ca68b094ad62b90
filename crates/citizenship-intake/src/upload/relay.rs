use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::path::storage_path;
use super::storage::{BlobStore, PutOptions};
use crate::config::DEFAULT_MAX_UPLOAD_BYTES;

/// Wire shape of an upload request. Every field is optional so that missing
/// values surface as [`UploadError::MissingFields`] rather than a parse error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub doc_id: Option<String>,
}

/// Outcome of a stored upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub url: String,
    pub path: String,
    pub file_name: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Missing required fields")]
    MissingFields,
    #[error("invalid base64 payload: {0}")]
    Decoding(String),
    #[error("decoded file is {size} bytes, limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },
    #[error("upload failed: {0}")]
    Failed(String),
}

/// Decodes base64 file bodies and forwards them to blob storage. The relay
/// never touches the application registry.
#[derive(Debug)]
pub struct UploadRelay<S> {
    store: Arc<S>,
    max_bytes: usize,
}

impl<S> UploadRelay<S>
where
    S: BlobStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self::with_limit(store, DEFAULT_MAX_UPLOAD_BYTES)
    }

    pub fn with_limit(store: Arc<S>, max_bytes: usize) -> Self {
        Self { store, max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub async fn submit(&self, request: UploadRequest) -> Result<UploadReceipt, UploadError> {
        let (payload, file_name, client_name, document_id) = required_fields(request)?;

        let bytes = BASE64
            .decode(payload.trim())
            .map_err(|err| UploadError::Decoding(err.to_string()))?;
        if bytes.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                size: bytes.len(),
                limit: self.max_bytes,
            });
        }

        let token = Uuid::new_v4().to_string();
        let path = storage_path(&client_name, &document_id, &file_name, &token);
        let size = bytes.len() as u64;

        let blob = self
            .store
            .put(&path, bytes, PutOptions::default())
            .await
            .map_err(|err| {
                warn!(%path, error = %err, "blob storage rejected upload");
                UploadError::Failed(err.to_string())
            })?;

        info!(path = %blob.path, size, "document stored");

        Ok(UploadReceipt {
            url: blob.url,
            path: blob.path,
            file_name,
            size,
            uploaded_at: Utc::now(),
        })
    }
}

fn required_fields(
    request: UploadRequest,
) -> Result<(String, String, String, String), UploadError> {
    fn present(value: Option<String>) -> Option<String> {
        value.filter(|value| !value.trim().is_empty())
    }

    match (
        present(request.file),
        present(request.file_name),
        present(request.client_name),
        present(request.doc_id),
    ) {
        (Some(file), Some(file_name), Some(client_name), Some(doc_id)) => {
            Ok((file, file_name, client_name, doc_id))
        }
        _ => Err(UploadError::MissingFields),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::storage::{BlobStoreError, MemoryBlobStore, StoredBlob};
    use async_trait::async_trait;

    #[derive(Debug)]
    struct OfflineStore;

    #[async_trait]
    impl BlobStore for OfflineStore {
        async fn put(
            &self,
            _path: &str,
            _bytes: Vec<u8>,
            _options: PutOptions,
        ) -> Result<StoredBlob, BlobStoreError> {
            Err(BlobStoreError::Backend("connection reset".to_string()))
        }
    }

    fn request(file: &str) -> UploadRequest {
        UploadRequest {
            file: Some(file.to_string()),
            file_name: Some("a.pdf".to_string()),
            client_name: Some("Jane Doe".to_string()),
            doc_id: Some("passport_bio".to_string()),
        }
    }

    fn ten_bytes() -> String {
        BASE64.encode(b"0123456789")
    }

    #[tokio::test]
    async fn submit_stores_decoded_bytes_under_client_folder() {
        let store = Arc::new(MemoryBlobStore::default());
        let relay = UploadRelay::new(store.clone());

        let receipt = relay.submit(request(&ten_bytes())).await.expect("uploads");

        assert_eq!(receipt.size, 10);
        assert_eq!(receipt.file_name, "a.pdf");
        let token = receipt
            .path
            .strip_prefix("Jane-Doe/passport_bio-")
            .and_then(|rest| rest.strip_suffix(".pdf"))
            .expect("path pattern");
        assert!(Uuid::parse_str(token).is_ok());
        assert_eq!(store.get(&receipt.path), Some(b"0123456789".to_vec()));
        assert_eq!(receipt.url, format!("memory://{}", receipt.path));
    }

    #[tokio::test]
    async fn submit_requires_every_field() {
        let relay = UploadRelay::new(Arc::new(MemoryBlobStore::default()));

        let mut missing_client = request(&ten_bytes());
        missing_client.client_name = Some("   ".to_string());
        assert!(matches!(
            relay.submit(missing_client).await,
            Err(UploadError::MissingFields)
        ));

        assert!(matches!(
            relay.submit(UploadRequest::default()).await,
            Err(UploadError::MissingFields)
        ));
    }

    #[tokio::test]
    async fn submit_reports_malformed_base64() {
        let relay = UploadRelay::new(Arc::new(MemoryBlobStore::default()));
        let result = relay.submit(request("not base64!!")).await;
        assert!(matches!(result, Err(UploadError::Decoding(_))));
    }

    #[tokio::test]
    async fn submit_enforces_size_limit() {
        let relay = UploadRelay::with_limit(Arc::new(MemoryBlobStore::default()), 4);
        let result = relay.submit(request(&ten_bytes())).await;
        assert!(matches!(
            result,
            Err(UploadError::TooLarge { size: 10, limit: 4 })
        ));
    }

    #[tokio::test]
    async fn submit_wraps_storage_failures() {
        let relay = UploadRelay::new(Arc::new(OfflineStore));
        match relay.submit(request(&ten_bytes())).await {
            Err(UploadError::Failed(message)) => assert!(message.contains("connection reset")),
            other => panic!("expected upload failure, got {other:?}"),
        }
    }
}
