use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryApplicationRepository};
use crate::routes::with_application_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use citizenship_intake::config::AppConfig;
use citizenship_intake::error::AppError;
use citizenship_intake::intake::{ChecklistCatalog, ChecklistService};
use citizenship_intake::telemetry;
use citizenship_intake::upload::{FilesystemBlobStore, UploadRelay};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        storage_root: Arc::new(config.storage.root.clone()),
    };

    tokio::fs::create_dir_all(&config.storage.root).await?;
    let store = Arc::new(FilesystemBlobStore::new(
        config.storage.root.clone(),
        config.storage.public_base_url.clone(),
    ));
    let relay = Arc::new(UploadRelay::with_limit(
        store,
        config.storage.max_upload_bytes,
    ));
    let repository = Arc::new(InMemoryApplicationRepository::default());
    let checklist_service = Arc::new(ChecklistService::new(
        ChecklistCatalog::standard(),
        repository,
        relay,
    ));

    let app = with_application_routes(checklist_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        storage_root = %config.storage.root.display(),
        max_upload_bytes = config.storage.max_upload_bytes,
        "citizenship intake service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
