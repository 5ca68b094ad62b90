use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::catalog::ChecklistCatalog;
use super::domain::{ApplicationId, ApplicationRecord, DocumentStatus, FilePayload};
use super::registry::{reduce, RegistryAction, RegistryError};
use super::report::{ChecklistReport, ChecklistSummary};
use super::repository::{ApplicationRepository, RepositoryError};
use crate::upload::{BlobStore, UploadError, UploadRelay, UploadRequest};

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

/// Service composing the catalog, the registry repository and the upload relay.
pub struct ChecklistService<R, S> {
    catalog: Arc<ChecklistCatalog>,
    repository: Arc<R>,
    relay: Arc<UploadRelay<S>>,
}

impl<R, S> ChecklistService<R, S>
where
    R: ApplicationRepository + 'static,
    S: BlobStore + 'static,
{
    pub fn new(catalog: ChecklistCatalog, repository: Arc<R>, relay: Arc<UploadRelay<S>>) -> Self {
        Self {
            catalog: Arc::new(catalog),
            repository,
            relay,
        }
    }

    pub fn catalog(&self) -> &ChecklistCatalog {
        &self.catalog
    }

    pub fn relay(&self) -> &Arc<UploadRelay<S>> {
        &self.relay
    }

    /// Create a record with every catalog document pending, placed first in the registry.
    pub fn create_application(
        &self,
        client_name: &str,
        client_email: &str,
    ) -> Result<ApplicationRecord, ChecklistServiceError> {
        let record = self.commit(RegistryAction::CreateApplication {
            id: next_application_id(),
            client_name: client_name.to_string(),
            client_email: client_email.to_string(),
            created_at: Utc::now(),
        })?;
        info!(application_id = %record.id, documents = record.documents.len(), "application created");
        Ok(record)
    }

    /// Attach a file to a checklist entry and move it into review. An absent
    /// payload leaves the record untouched.
    pub fn attach_document(
        &self,
        application_id: &ApplicationId,
        document_id: &str,
        payload: Option<FilePayload>,
    ) -> Result<ApplicationRecord, ChecklistServiceError> {
        self.attach_document_at(application_id, document_id, payload, Utc::now())
    }

    fn attach_document_at(
        &self,
        application_id: &ApplicationId,
        document_id: &str,
        payload: Option<FilePayload>,
        uploaded_at: DateTime<Utc>,
    ) -> Result<ApplicationRecord, ChecklistServiceError> {
        let attached = payload.is_some();
        let record = self.commit(RegistryAction::AttachDocument {
            application_id: application_id.clone(),
            document_id: document_id.to_string(),
            payload,
            uploaded_at,
        })?;
        if attached {
            info!(%application_id, document_id, "document attached for review");
        }
        Ok(record)
    }

    pub fn set_document_status(
        &self,
        application_id: &ApplicationId,
        document_id: &str,
        status: DocumentStatus,
        notes: &str,
    ) -> Result<ApplicationRecord, ChecklistServiceError> {
        let record = self.commit(RegistryAction::SetDocumentStatus {
            application_id: application_id.clone(),
            document_id: document_id.to_string(),
            status,
            notes: notes.to_string(),
        })?;
        info!(%application_id, document_id, status = status.label(), "document status updated");
        Ok(record)
    }

    /// Revert a checklist entry to its initial pending state.
    pub fn clear_document(
        &self,
        application_id: &ApplicationId,
        document_id: &str,
    ) -> Result<ApplicationRecord, ChecklistServiceError> {
        let record = self.commit(RegistryAction::ClearDocument {
            application_id: application_id.clone(),
            document_id: document_id.to_string(),
        })?;
        info!(%application_id, document_id, "document cleared");
        Ok(record)
    }

    /// Relay a base64 file to blob storage, then attach the stored URL.
    pub async fn upload_document(
        &self,
        application_id: &ApplicationId,
        document_id: &str,
        file_name: &str,
        base64_payload: String,
    ) -> Result<ApplicationRecord, ChecklistServiceError> {
        let record = self.get(application_id)?;
        if !record.documents.contains_key(document_id) {
            return Err(RegistryError::DocumentNotFound {
                application_id: application_id.clone(),
                document_id: document_id.to_string(),
            }
            .into());
        }

        let receipt = self
            .relay
            .submit(UploadRequest {
                file: Some(base64_payload),
                file_name: Some(file_name.to_string()),
                client_name: Some(record.client_name),
                doc_id: Some(document_id.to_string()),
            })
            .await?;

        let uploaded_at = receipt.uploaded_at;
        let payload = FilePayload {
            file_name: receipt.file_name,
            size: receipt.size,
            storage_url: Some(receipt.url),
            content_type: None,
        };
        let stored_path = receipt.path;
        self.attach_document_at(application_id, document_id, Some(payload), uploaded_at)
            .map_err(|err| {
                warn!(
                    %application_id,
                    document_id,
                    path = %stored_path,
                    error = %err,
                    "stored document could not be attached; blob is orphaned"
                );
                err
            })
    }

    pub fn get(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ApplicationRecord, ChecklistServiceError> {
        let state = self.repository.snapshot()?;
        state
            .find(application_id)
            .cloned()
            .ok_or_else(|| RegistryError::ApplicationNotFound(application_id.clone()).into())
    }

    /// All records, newest first.
    pub fn list(&self) -> Result<Vec<ApplicationRecord>, ChecklistServiceError> {
        Ok(self.repository.snapshot()?.applications)
    }

    pub fn progress(&self, application_id: &ApplicationId) -> Result<u8, ChecklistServiceError> {
        Ok(self.get(application_id)?.progress())
    }

    pub fn summary(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ChecklistSummary, ChecklistServiceError> {
        Ok(self.get(application_id)?.summary(&self.catalog))
    }

    pub fn report(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ChecklistReport, ChecklistServiceError> {
        let record = self.get(application_id)?;
        Ok(ChecklistReport::build(&record, &self.catalog))
    }

    fn commit(&self, action: RegistryAction) -> Result<ApplicationRecord, ChecklistServiceError> {
        self.repository
            .update(|state| reduce(state, &self.catalog, action).map_err(ChecklistServiceError::from))
    }
}

/// Error raised by the checklist service.
#[derive(Debug, thiserror::Error)]
pub enum ChecklistServiceError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Upload(#[from] UploadError),
}
