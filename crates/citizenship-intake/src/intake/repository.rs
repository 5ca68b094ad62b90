use super::domain::ApplicationRecord;
use super::registry::{RegistryState, Transition};

/// Storage abstraction so the service module can be exercised in isolation.
///
/// The repository is the single owner of the registry. `update` runs the
/// reducer against the current state while holding exclusive access, so
/// writes apply one at a time and never observe each other half-done. A
/// transition with `changed == false` leaves the stored state untouched.
pub trait ApplicationRepository: Send + Sync {
    fn snapshot(&self) -> Result<RegistryState, RepositoryError>;

    fn update<F, E>(&self, apply: F) -> Result<ApplicationRecord, E>
    where
        F: FnOnce(&RegistryState) -> Result<Transition, E>,
        E: From<RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
