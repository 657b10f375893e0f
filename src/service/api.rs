// Package service provides the managed service capability.

use async_trait::async_trait;

use super::error::ServiceError;
use crate::model::ServiceEndpoint;

/// Result of asking a running service to absorb an endpoint change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The change was applied in place; the service keeps running.
    Applied,
    /// The service cannot absorb the change and must be restarted.
    RestartRequired,
}

/// ManagedService is implemented by every service instance the orchestrator
/// drives. Concrete implementations come from the registry provider.
#[async_trait]
pub trait ManagedService: Send + Sync {
    /// Gets the service name.
    fn name(&self) -> &str;

    /// Endpoint the service currently serves.
    fn endpoint(&self) -> ServiceEndpoint;

    /// Prepares the service. Must succeed before `start`.
    async fn initialize(&self) -> Result<(), ServiceError>;

    /// Starts the service.
    async fn start(&self) -> Result<(), ServiceError>;

    /// Stops the service.
    async fn stop(&self) -> Result<(), ServiceError>;

    /// Applies an endpoint change without a stop/start cycle if possible.
    async fn update(&self, endpoint: &ServiceEndpoint) -> Result<UpdateOutcome, ServiceError> {
        let _ = endpoint;
        Ok(UpdateOutcome::RestartRequired)
    }
}
