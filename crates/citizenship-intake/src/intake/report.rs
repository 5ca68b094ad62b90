use std::io;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::catalog::ChecklistCatalog;
use super::domain::{
    ApplicationId, ApplicationRecord, DocumentState, DocumentStatus, FileReference, StatusStyle,
};

/// One checklist line in catalog display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistItemView {
    pub category: String,
    pub document_id: String,
    pub label: String,
    pub required: bool,
    pub status: DocumentStatus,
    pub style: StatusStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileReference>,
    pub review_notes: String,
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// API representation of a record with its progress and ordered checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationView {
    pub id: ApplicationId,
    pub client_name: String,
    pub client_email: String,
    pub created_at: DateTime<Utc>,
    pub progress: u8,
    pub checklist: Vec<ChecklistItemView>,
}

impl ApplicationView {
    pub fn build(record: &ApplicationRecord, catalog: &ChecklistCatalog) -> Self {
        Self {
            id: record.id.clone(),
            client_name: record.client_name.clone(),
            client_email: record.client_email.clone(),
            created_at: record.created_at,
            progress: record.progress(),
            checklist: checklist_items(record, catalog),
        }
    }
}

/// Checklist lines ordered by the catalog. Entries the record carries but the
/// catalog no longer lists are appended after the catalog order.
pub fn checklist_items(record: &ApplicationRecord, catalog: &ChecklistCatalog) -> Vec<ChecklistItemView> {
    let mut items: Vec<ChecklistItemView> = catalog
        .documents()
        .filter_map(|entry| {
            let state = record.document(entry.definition.id)?;
            Some(item_view(
                entry.category,
                entry.definition.id,
                entry.definition.label,
                entry.definition.required,
                state,
            ))
        })
        .collect();

    items.extend(
        record
            .documents
            .iter()
            .filter(|(document_id, _)| !catalog.contains(document_id))
            .map(|(document_id, state)| item_view("", document_id, document_id, false, state)),
    );

    items
}

fn item_view(
    category: &str,
    document_id: &str,
    label: &str,
    required: bool,
    state: &DocumentState,
) -> ChecklistItemView {
    ChecklistItemView {
        category: category.to_string(),
        document_id: document_id.to_string(),
        label: label.to_string(),
        required,
        status: state.status,
        style: state.status.style(),
        file: state.file.clone(),
        review_notes: state.review_notes.clone(),
        uploaded_at: state.uploaded_at,
    }
}

/// Counts staff look at when deciding whether an application is ready to file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistSummary {
    pub application_id: ApplicationId,
    pub client_name: String,
    pub progress: u8,
    pub total: usize,
    pub pending: usize,
    pub review: usize,
    pub approved: usize,
    pub rejected: usize,
    pub required_total: usize,
    pub required_approved: usize,
    pub outstanding_required: Vec<String>,
}

impl ChecklistSummary {
    pub fn build(record: &ApplicationRecord, catalog: &ChecklistCatalog) -> Self {
        let mut required_total = 0;
        let mut required_approved = 0;
        let mut outstanding_required = Vec::new();

        for document_id in catalog.required_ids() {
            let Some(state) = record.document(document_id) else {
                continue;
            };
            required_total += 1;
            if state.status == DocumentStatus::Approved {
                required_approved += 1;
            } else {
                outstanding_required.push(document_id.to_string());
            }
        }

        Self {
            application_id: record.id.clone(),
            client_name: record.client_name.clone(),
            progress: record.progress(),
            total: record.documents.len(),
            pending: record.count_with_status(DocumentStatus::Pending),
            review: record.count_with_status(DocumentStatus::Review),
            approved: record.count_with_status(DocumentStatus::Approved),
            rejected: record.count_with_status(DocumentStatus::Rejected),
            required_total,
            required_approved,
            outstanding_required,
        }
    }

    pub fn ready_to_file(&self) -> bool {
        self.outstanding_required.is_empty()
    }
}

#[derive(Debug, Serialize)]
struct ChecklistCsvRow<'a> {
    category: &'a str,
    document_id: &'a str,
    label: &'a str,
    required: bool,
    status: &'static str,
    file_name: Option<&'a str>,
    storage_url: Option<&'a str>,
    uploaded_at: Option<String>,
    review_notes: &'a str,
}

/// Exportable checklist for one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistReport {
    pub application_id: ApplicationId,
    pub client_name: String,
    pub progress: u8,
    pub items: Vec<ChecklistItemView>,
}

impl ChecklistReport {
    pub fn build(record: &ApplicationRecord, catalog: &ChecklistCatalog) -> Self {
        Self {
            application_id: record.id.clone(),
            client_name: record.client_name.clone(),
            progress: record.progress(),
            items: checklist_items(record, catalog),
        }
    }

    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for item in &self.items {
            csv_writer.serialize(ChecklistCsvRow {
                category: &item.category,
                document_id: &item.document_id,
                label: &item.label,
                required: item.required,
                status: item.status.label(),
                file_name: item.file.as_ref().map(|file| file.file_name.as_str()),
                storage_url: item
                    .file
                    .as_ref()
                    .and_then(|file| file.storage_url.as_deref()),
                uploaded_at: item.uploaded_at.map(|at| at.to_rfc3339()),
                review_notes: &item.review_notes,
            })?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String, csv::Error> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        String::from_utf8(buffer).map_err(|err| {
            csv::Error::from(io::Error::new(io::ErrorKind::InvalidData, err))
        })
    }
}
