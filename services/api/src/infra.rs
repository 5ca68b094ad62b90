use citizenship_intake::intake::{
    ApplicationRecord, ApplicationRepository, RegistryState, RepositoryError, Transition,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) storage_root: Arc<PathBuf>,
}

/// Process-local registry. Every write runs the reducer while holding the
/// mutex, so concurrent requests apply one after another.
#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicationRepository {
    state: Arc<Mutex<RegistryState>>,
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn snapshot(&self) -> Result<RegistryState, RepositoryError> {
        let guard = self
            .state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("registry mutex poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn update<F, E>(&self, apply: F) -> Result<ApplicationRecord, E>
    where
        F: FnOnce(&RegistryState) -> Result<Transition, E>,
        E: From<RepositoryError>,
    {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("registry mutex poisoned".to_string()))?;
        let transition = apply(&guard)?;
        if transition.changed {
            *guard = transition.state;
        }
        Ok(transition.record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use citizenship_intake::intake::{
        reduce, ApplicationId, ChecklistCatalog, ChecklistServiceError, RegistryAction,
        RegistryError,
    };

    fn create_action(id: &str, client_name: &str) -> RegistryAction {
        RegistryAction::CreateApplication {
            id: ApplicationId(id.to_string()),
            client_name: client_name.to_string(),
            client_email: "lena@example.com".to_string(),
            created_at: Utc::now(),
        }
    }

    fn apply(
        repository: &InMemoryApplicationRepository,
        action: RegistryAction,
    ) -> Result<ApplicationRecord, ChecklistServiceError> {
        let catalog = ChecklistCatalog::standard();
        repository.update(|state| {
            reduce(state, &catalog, action).map_err(ChecklistServiceError::from)
        })
    }

    #[test]
    fn updates_build_on_the_latest_state() {
        let repository = InMemoryApplicationRepository::default();

        apply(&repository, create_action("app-a", "Lena Novak")).expect("first create");
        apply(&repository, create_action("app-b", "Omar Haddad")).expect("second create");

        let state = repository.snapshot().expect("snapshot");
        assert_eq!(state.len(), 2);
        assert_eq!(state.revision, 2);
        assert_eq!(state.applications[0].id, ApplicationId("app-b".to_string()));
    }

    #[test]
    fn rejected_transition_leaves_state_untouched() {
        let repository = InMemoryApplicationRepository::default();
        apply(&repository, create_action("app-a", "Lena Novak")).expect("create");

        let err = apply(&repository, create_action("app-b", "  ")).expect_err("blank name");
        assert!(matches!(
            err,
            ChecklistServiceError::Registry(RegistryError::Validation(_))
        ));
        let state = repository.snapshot().expect("snapshot");
        assert_eq!(state.len(), 1);
        assert_eq!(state.revision, 1);
    }
}
