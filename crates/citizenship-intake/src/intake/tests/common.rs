use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::intake::domain::ApplicationRecord;
use crate::intake::registry::{RegistryState, Transition};
use crate::intake::repository::{ApplicationRepository, RepositoryError};
use crate::intake::{application_router, ChecklistCatalog, ChecklistService};
use crate::upload::{MemoryBlobStore, UploadRelay};

pub(super) type TestService = ChecklistService<MemoryRepository, MemoryBlobStore>;

pub(super) fn build_service() -> (TestService, Arc<MemoryRepository>, Arc<MemoryBlobStore>) {
    let repository = Arc::new(MemoryRepository::default());
    let store = Arc::new(MemoryBlobStore::default());
    let relay = Arc::new(UploadRelay::new(store.clone()));
    let service = ChecklistService::new(ChecklistCatalog::standard(), repository.clone(), relay);
    (service, repository, store)
}

pub(super) fn service_with<R>(
    repository: Arc<R>,
) -> (ChecklistService<R, MemoryBlobStore>, Arc<MemoryBlobStore>)
where
    R: ApplicationRepository + 'static,
{
    let store = Arc::new(MemoryBlobStore::default());
    let relay = Arc::new(UploadRelay::new(store.clone()));
    (
        ChecklistService::new(ChecklistCatalog::standard(), repository, relay),
        store,
    )
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) state: Arc<Mutex<RegistryState>>,
}

impl MemoryRepository {
    pub(super) fn len(&self) -> usize {
        self.state.lock().expect("repository mutex poisoned").len()
    }

    pub(super) fn snapshot_revision(&self) -> u64 {
        self.state.lock().expect("repository mutex poisoned").revision
    }
}

impl ApplicationRepository for MemoryRepository {
    fn snapshot(&self) -> Result<RegistryState, RepositoryError> {
        Ok(self.state.lock().expect("repository mutex poisoned").clone())
    }

    fn update<F, E>(&self, apply: F) -> Result<ApplicationRecord, E>
    where
        F: FnOnce(&RegistryState) -> Result<Transition, E>,
        E: From<RepositoryError>,
    {
        let mut guard = self.state.lock().expect("repository mutex poisoned");
        let transition = apply(&guard)?;
        if transition.changed {
            *guard = transition.state;
        }
        Ok(transition.record)
    }
}

pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn snapshot(&self) -> Result<RegistryState, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update<F, E>(&self, _apply: F) -> Result<ApplicationRecord, E>
    where
        F: FnOnce(&RegistryState) -> Result<Transition, E>,
        E: From<RepositoryError>,
    {
        Err(RepositoryError::Unavailable("database offline".to_string()).into())
    }
}

/// Serves reads from a fixed state but refuses every write.
pub(super) struct ReadOnlyRepository {
    pub(super) state: RegistryState,
}

impl ApplicationRepository for ReadOnlyRepository {
    fn snapshot(&self) -> Result<RegistryState, RepositoryError> {
        Ok(self.state.clone())
    }

    fn update<F, E>(&self, _apply: F) -> Result<ApplicationRecord, E>
    where
        F: FnOnce(&RegistryState) -> Result<Transition, E>,
        E: From<RepositoryError>,
    {
        Err(RepositoryError::Unavailable("registry is read-only".to_string()).into())
    }
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    application_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf-8 body")
}
