//! Client application registry and document checklist tracking.

pub mod catalog;
pub mod domain;
pub mod registry;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use catalog::{CatalogEntry, CatalogError, ChecklistCatalog, DocumentCategory, DocumentDefinition};
pub use domain::{
    ApplicationId, ApplicationRecord, DocumentState, DocumentStatus, FilePayload, FileReference,
    StatusStyle, UnknownStatus,
};
pub use registry::{
    compute_progress, reduce, RegistryAction, RegistryError, RegistryState, Transition,
    MISSING_CLIENT_DETAILS,
};
pub use report::{ApplicationView, ChecklistItemView, ChecklistReport, ChecklistSummary};
pub use repository::{ApplicationRepository, RepositoryError};
pub use router::application_router;
pub use service::{ChecklistService, ChecklistServiceError};
