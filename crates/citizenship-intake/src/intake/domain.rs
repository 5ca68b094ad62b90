use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::ChecklistCatalog;
use super::report::ChecklistSummary;

/// Identifier wrapper for client application records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Review state of one checklist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Pending,
    Review,
    Approved,
    Rejected,
}

impl DocumentStatus {
    pub const ALL: [DocumentStatus; 4] = [
        DocumentStatus::Pending,
        DocumentStatus::Review,
        DocumentStatus::Approved,
        DocumentStatus::Rejected,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Review => "review",
            DocumentStatus::Approved => "approved",
            DocumentStatus::Rejected => "rejected",
        }
    }

    pub const fn style(self) -> StatusStyle {
        match self {
            DocumentStatus::Pending => StatusStyle {
                tone: "neutral",
                icon: "upload",
            },
            DocumentStatus::Review => StatusStyle {
                tone: "warning",
                icon: "alert",
            },
            DocumentStatus::Approved => StatusStyle {
                tone: "success",
                icon: "check",
            },
            DocumentStatus::Rejected => StatusStyle {
                tone: "danger",
                icon: "alert",
            },
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown document status '{0}' (expected pending, review, approved or rejected)")]
pub struct UnknownStatus(pub String);

impl FromStr for DocumentStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        DocumentStatus::ALL
            .into_iter()
            .find(|status| status.label() == normalized)
            .ok_or_else(|| UnknownStatus(value.to_string()))
    }
}

/// Display attributes for a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusStyle {
    pub tone: &'static str,
    pub icon: &'static str,
}

/// Handle to an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_url: Option<String>,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// File data handed to an attach operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePayload {
    pub file_name: String,
    pub size: u64,
    #[serde(default)]
    pub storage_url: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl From<FilePayload> for FileReference {
    fn from(payload: FilePayload) -> Self {
        let content_type = payload.content_type.or_else(|| {
            mime_guess::from_path(&payload.file_name)
                .first()
                .map(|mime| mime.essence_str().to_string())
        });

        Self {
            file_name: payload.file_name,
            storage_url: payload.storage_url,
            size: payload.size,
            content_type,
        }
    }
}

/// Per-application state of one checklist entry. `Default` is the initial
/// pending state every record starts with.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentState {
    pub status: DocumentStatus,
    #[serde(default)]
    pub file: Option<FileReference>,
    #[serde(default)]
    pub review_notes: String,
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// A client's application and its checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: ApplicationId,
    pub client_name: String,
    pub client_email: String,
    pub created_at: DateTime<Utc>,
    pub documents: BTreeMap<String, DocumentState>,
}

impl ApplicationRecord {
    pub fn document(&self, document_id: &str) -> Option<&DocumentState> {
        self.documents.get(document_id)
    }

    pub fn count_with_status(&self, status: DocumentStatus) -> usize {
        self.documents
            .values()
            .filter(|document| document.status == status)
            .count()
    }

    /// Percentage of checklist entries currently approved.
    pub fn progress(&self) -> u8 {
        super::registry::compute_progress(self)
    }

    pub fn summary(&self, catalog: &ChecklistCatalog) -> ChecklistSummary {
        ChecklistSummary::build(self, catalog)
    }
}
