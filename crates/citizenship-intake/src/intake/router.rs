use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::catalog::DocumentCategory;
use super::domain::{ApplicationId, DocumentStatus};
use super::registry::RegistryError;
use super::report::ApplicationView;
use super::repository::ApplicationRepository;
use super::service::{ChecklistService, ChecklistServiceError};
use crate::config::request_body_limit;
use crate::upload::router::{
    body_rejection_response, parse_body, string_field, upload_error_response,
};
use crate::upload::{BlobStore, UploadError};

type SharedService<R, S> = Arc<ChecklistService<R, S>>;

#[derive(Debug, Default, Deserialize)]
pub struct CreateApplicationRequest {
    #[serde(default, alias = "clientName")]
    pub client_name: String,
    #[serde(default, alias = "clientEmail")]
    pub client_email: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
    #[serde(default)]
    pub notes: String,
}

/// Fields of a checklist upload. Both are optional so that a malformed body
/// surfaces as missing fields rather than a parse error.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DocumentUploadRequest {
    pub file_name: Option<String>,
    pub file: Option<String>,
}

impl DocumentUploadRequest {
    pub fn from_body(body: &[u8]) -> Self {
        let value = parse_body(body);
        Self {
            file_name: string_field(&value, &["fileName", "file_name"]),
            file: string_field(&value, &["file"]),
        }
    }
}

/// Router builder exposing the checklist registry over HTTP.
pub fn application_router<R, S>(service: SharedService<R, S>) -> Router
where
    R: ApplicationRepository + 'static,
    S: BlobStore + 'static,
{
    let body_limit = request_body_limit(service.relay().max_bytes());

    Router::new()
        .route("/api/v1/catalog", get(catalog_handler::<R, S>))
        .route(
            "/api/v1/applications",
            get(list_handler::<R, S>).post(create_handler::<R, S>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(get_handler::<R, S>),
        )
        .route(
            "/api/v1/applications/:application_id/summary",
            get(summary_handler::<R, S>),
        )
        .route(
            "/api/v1/applications/:application_id/checklist.csv",
            get(checklist_csv_handler::<R, S>),
        )
        .route(
            "/api/v1/applications/:application_id/documents/:document_id",
            delete(clear_handler::<R, S>),
        )
        .route(
            "/api/v1/applications/:application_id/documents/:document_id/status",
            put(status_handler::<R, S>),
        )
        .route(
            "/api/v1/applications/:application_id/documents/:document_id/upload",
            post(upload_handler::<R, S>).layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(service)
}

pub(crate) async fn catalog_handler<R, S>(
    State(service): State<SharedService<R, S>>,
) -> Json<Vec<DocumentCategory>>
where
    R: ApplicationRepository + 'static,
    S: BlobStore + 'static,
{
    Json(service.catalog().categories().to_vec())
}

pub(crate) async fn list_handler<R, S>(State(service): State<SharedService<R, S>>) -> Response
where
    R: ApplicationRepository + 'static,
    S: BlobStore + 'static,
{
    match service.list() {
        Ok(records) => {
            let views: Vec<ApplicationView> = records
                .iter()
                .map(|record| ApplicationView::build(record, service.catalog()))
                .collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_handler<R, S>(
    State(service): State<SharedService<R, S>>,
    Json(request): Json<CreateApplicationRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: BlobStore + 'static,
{
    match service.create_application(&request.client_name, &request.client_email) {
        Ok(record) => {
            let view = ApplicationView::build(&record, service.catalog());
            (StatusCode::CREATED, Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_handler<R, S>(
    State(service): State<SharedService<R, S>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: BlobStore + 'static,
{
    match service.get(&ApplicationId(application_id)) {
        Ok(record) => {
            let view = ApplicationView::build(&record, service.catalog());
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn summary_handler<R, S>(
    State(service): State<SharedService<R, S>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: BlobStore + 'static,
{
    match service.summary(&ApplicationId(application_id)) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn checklist_csv_handler<R, S>(
    State(service): State<SharedService<R, S>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: BlobStore + 'static,
{
    let report = match service.report(&ApplicationId(application_id)) {
        Ok(report) => report,
        Err(err) => return error_response(err),
    };

    match report.to_csv_string() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "unable to render checklist csv");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

pub(crate) async fn status_handler<R, S>(
    State(service): State<SharedService<R, S>>,
    Path((application_id, document_id)): Path<(String, String)>,
    Json(request): Json<StatusUpdateRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: BlobStore + 'static,
{
    let status = match request.status.parse::<DocumentStatus>() {
        Ok(status) => status,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    };

    let id = ApplicationId(application_id);
    match service.set_document_status(&id, &document_id, status, &request.notes) {
        Ok(record) => {
            let view = ApplicationView::build(&record, service.catalog());
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn clear_handler<R, S>(
    State(service): State<SharedService<R, S>>,
    Path((application_id, document_id)): Path<(String, String)>,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: BlobStore + 'static,
{
    match service.clear_document(&ApplicationId(application_id), &document_id) {
        Ok(record) => {
            let view = ApplicationView::build(&record, service.catalog());
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn upload_handler<R, S>(
    State(service): State<SharedService<R, S>>,
    Path((application_id, document_id)): Path<(String, String)>,
    body: Result<Bytes, BytesRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: BlobStore + 'static,
{
    let request = match body {
        Ok(body) => DocumentUploadRequest::from_body(&body),
        Err(rejection) => return body_rejection_response(rejection),
    };
    let (Some(file_name), Some(file)) = (request.file_name, request.file) else {
        return upload_error_response(UploadError::MissingFields);
    };

    let id = ApplicationId(application_id);
    match service
        .upload_document(&id, &document_id, &file_name, file)
        .await
    {
        Ok(record) => {
            let view = ApplicationView::build(&record, service.catalog());
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) fn error_response(err: ChecklistServiceError) -> Response {
    let (status, message) = match err {
        ChecklistServiceError::Upload(upload) => return upload_error_response(upload),
        ChecklistServiceError::Registry(RegistryError::Validation(message)) => {
            (StatusCode::BAD_REQUEST, message)
        }
        ChecklistServiceError::Registry(other) => (StatusCode::NOT_FOUND, other.to_string()),
        ChecklistServiceError::Repository(other) => {
            error!(error = %other, "registry repository failure");
            (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    };

    (status, Json(json!({ "error": message }))).into_response()
}
