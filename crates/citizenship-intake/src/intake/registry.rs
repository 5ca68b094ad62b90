//! Pure state transitions over the application registry.
//!
//! Every mutation is expressed as a [`RegistryAction`] applied to an immutable
//! [`RegistryState`]; identifiers and timestamps arrive inside the action so the
//! reducer has no hidden inputs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::ChecklistCatalog;
use super::domain::{
    ApplicationId, ApplicationRecord, DocumentState, DocumentStatus, FilePayload, FileReference,
};

/// Shown to staff when the create form is submitted without a name or e-mail.
pub const MISSING_CLIENT_DETAILS: &str = "يرجى إدخال اسم العميل والبريد الإلكتروني";

/// Ordered application records, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryState {
    pub applications: Vec<ApplicationRecord>,
    pub revision: u64,
}

impl RegistryState {
    pub fn find(&self, id: &ApplicationId) -> Option<&ApplicationRecord> {
        self.applications.iter().find(|record| &record.id == id)
    }

    pub fn len(&self) -> usize {
        self.applications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applications.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryAction {
    CreateApplication {
        id: ApplicationId,
        client_name: String,
        client_email: String,
        created_at: DateTime<Utc>,
    },
    AttachDocument {
        application_id: ApplicationId,
        document_id: String,
        payload: Option<FilePayload>,
        uploaded_at: DateTime<Utc>,
    },
    SetDocumentStatus {
        application_id: ApplicationId,
        document_id: String,
        status: DocumentStatus,
        notes: String,
    },
    ClearDocument {
        application_id: ApplicationId,
        document_id: String,
    },
}

/// Result of a successful reduction: the next state and the record it touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: RegistryState,
    pub record: ApplicationRecord,
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("{0}")]
    Validation(String),
    #[error("application '{0}' not found")]
    ApplicationNotFound(ApplicationId),
    #[error("document '{document_id}' is not on the checklist of application '{application_id}'")]
    DocumentNotFound {
        application_id: ApplicationId,
        document_id: String,
    },
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RegistryError::ApplicationNotFound(_) | RegistryError::DocumentNotFound { .. }
        )
    }
}

/// Build a fully populated record: one pending entry per catalog document.
pub fn new_application(
    catalog: &ChecklistCatalog,
    id: ApplicationId,
    client_name: &str,
    client_email: &str,
    created_at: DateTime<Utc>,
) -> Result<ApplicationRecord, RegistryError> {
    let client_name = client_name.trim();
    let client_email = client_email.trim();
    if client_name.is_empty() || client_email.is_empty() {
        return Err(RegistryError::Validation(MISSING_CLIENT_DETAILS.to_string()));
    }

    let documents: BTreeMap<String, DocumentState> = catalog
        .ids()
        .map(|document_id| (document_id.to_string(), DocumentState::default()))
        .collect();

    Ok(ApplicationRecord {
        id,
        client_name: client_name.to_string(),
        client_email: client_email.to_string(),
        created_at,
        documents,
    })
}

pub fn reduce(
    state: &RegistryState,
    catalog: &ChecklistCatalog,
    action: RegistryAction,
) -> Result<Transition, RegistryError> {
    match action {
        RegistryAction::CreateApplication {
            id,
            client_name,
            client_email,
            created_at,
        } => {
            let record = new_application(catalog, id, &client_name, &client_email, created_at)?;
            let mut applications = Vec::with_capacity(state.applications.len() + 1);
            applications.push(record.clone());
            applications.extend(state.applications.iter().cloned());

            Ok(Transition {
                state: RegistryState {
                    applications,
                    revision: state.revision + 1,
                },
                record,
                changed: true,
            })
        }
        RegistryAction::AttachDocument {
            application_id,
            document_id,
            payload,
            uploaded_at,
        } => {
            let Some(payload) = payload else {
                let record = checked_record(state, &application_id, &document_id)?.clone();
                return Ok(Transition {
                    state: state.clone(),
                    record,
                    changed: false,
                });
            };

            update_document(state, &application_id, &document_id, |document| {
                document.status = DocumentStatus::Review;
                document.file = Some(FileReference::from(payload));
                document.uploaded_at = Some(uploaded_at);
            })
        }
        RegistryAction::SetDocumentStatus {
            application_id,
            document_id,
            status,
            notes,
        } => update_document(state, &application_id, &document_id, |document| {
            document.status = status;
            document.review_notes = notes;
        }),
        RegistryAction::ClearDocument {
            application_id,
            document_id,
        } => update_document(state, &application_id, &document_id, |document| {
            *document = DocumentState::default();
        }),
    }
}

/// `round(100 * approved / total)`, rounding halves up.
pub fn compute_progress(record: &ApplicationRecord) -> u8 {
    let total = record.documents.len();
    if total == 0 {
        return 0;
    }
    let approved = record.count_with_status(DocumentStatus::Approved);
    let percent = (approved * 100 + total / 2) / total;
    percent.min(100) as u8
}

fn checked_record<'a>(
    state: &'a RegistryState,
    application_id: &ApplicationId,
    document_id: &str,
) -> Result<&'a ApplicationRecord, RegistryError> {
    let record = state
        .find(application_id)
        .ok_or_else(|| RegistryError::ApplicationNotFound(application_id.clone()))?;
    if !record.documents.contains_key(document_id) {
        return Err(RegistryError::DocumentNotFound {
            application_id: application_id.clone(),
            document_id: document_id.to_string(),
        });
    }
    Ok(record)
}

fn update_document<F>(
    state: &RegistryState,
    application_id: &ApplicationId,
    document_id: &str,
    apply: F,
) -> Result<Transition, RegistryError>
where
    F: FnOnce(&mut DocumentState),
{
    checked_record(state, application_id, document_id)?;

    let mut next = state.clone();
    next.revision += 1;
    let record = next
        .applications
        .iter_mut()
        .find(|record| &record.id == application_id)
        .ok_or_else(|| RegistryError::ApplicationNotFound(application_id.clone()))?;
    let document = record.documents.get_mut(document_id).ok_or_else(|| {
        RegistryError::DocumentNotFound {
            application_id: application_id.clone(),
            document_id: document_id.to_string(),
        }
    })?;
    apply(document);
    let record = record.clone();

    Ok(Transition {
        state: next,
        record,
        changed: true,
    })
}
