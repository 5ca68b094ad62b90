use crate::infra::AppState;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use citizenship_intake::intake::{application_router, ApplicationRepository, ChecklistService};
use citizenship_intake::upload::{upload_router, BlobStore};
use serde_json::json;
use std::path::{Component, PathBuf};
use std::sync::Arc;
use tracing::warn;

pub(crate) fn with_application_routes<R, S>(service: Arc<ChecklistService<R, S>>) -> axum::Router
where
    R: ApplicationRepository + 'static,
    S: BlobStore + 'static,
{
    let relay = Arc::clone(service.relay());

    application_router(service)
        .merge(upload_router(relay))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/files/*path", axum::routing::get(stored_file_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Serves documents written by the filesystem blob store so the URLs it hands
/// out resolve against this service.
pub(crate) async fn stored_file_endpoint(
    Extension(state): Extension<AppState>,
    Path(path): Path<String>,
) -> Response {
    let Some(target) = resolve_stored_file(&state.storage_root, &path) else {
        return not_found();
    };

    match tokio::fs::read(&target).await {
        Ok(bytes) => {
            let content_type = mime_guess::from_path(&target)
                .first_or_octet_stream()
                .essence_str()
                .to_string();
            (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => not_found(),
        Err(err) => {
            warn!(%path, error = %err, "unable to read stored document");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "unable to read stored document" })),
            )
                .into_response()
        }
    }
}

fn resolve_stored_file(root: &std::path::Path, path: &str) -> Option<PathBuf> {
    let relative = std::path::Path::new(path);
    let escapes = relative
        .components()
        .any(|component| !matches!(component, Component::Normal(_)));
    if path.is_empty() || escapes {
        return None;
    }
    Some(root.join(relative))
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "document not found" })),
    )
        .into_response()
}
