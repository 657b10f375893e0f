// Error definitions for the registry provider.

use crate::service::ServiceError;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry: watch for namespace {namespace} is unavailable: {reason}")]
    WatchUnavailable { namespace: String, reason: String },
    #[error("registry: cannot create {name} service: {reason}")]
    Create { name: String, reason: String },
    #[error("registry: service {0} is already registered")]
    AlreadyRegistered(String),
    #[error("registry: no such {0} service")]
    NotFound(String),
    #[error("registry: {failed} of {total} services failed to {action}")]
    Bulk {
        action: &'static str,
        failed: usize,
        total: usize,
    },
    #[error("registry: operation cancelled")]
    Cancelled,
    #[error("registry: closed")]
    Closed,
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl RegistryError {
    /// Errors caused by the request itself. Retrying cannot fix them and they
    /// say nothing about the provider's health.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            RegistryError::Create { .. }
                | RegistryError::AlreadyRegistered(_)
                | RegistryError::NotFound(_)
        )
    }
}
