// Package registry provides the service registry/discovery capability.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::error::RegistryError;
use crate::model::{Event, ServiceEndpoint};
use crate::service::ManagedService;

/// Registry interface consumed by the orchestrator and the supervisor.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Opens a membership event stream for the namespace. The stream ends
    /// (`recv` yields `None`) when the provider stops feeding it.
    async fn watch(
        &self,
        ctx: &CancellationToken,
        namespace: &str,
    ) -> Result<mpsc::Receiver<Event>, RegistryError>;

    /// Lists the endpoints currently known for the namespace.
    async fn discover(
        &self,
        ctx: &CancellationToken,
        namespace: &str,
    ) -> Result<Vec<ServiceEndpoint>, RegistryError>;

    /// Materializes an endpoint into a service object.
    async fn create_service(
        &self,
        endpoint: &ServiceEndpoint,
    ) -> Result<Arc<dyn ManagedService>, RegistryError>;

    /// Registers a service with the provider.
    async fn register(&self, service: Arc<dyn ManagedService>) -> Result<(), RegistryError>;

    /// Removes a service from the provider.
    async fn unregister(&self, name: &str) -> Result<(), RegistryError>;

    /// Lists the services currently registered with the provider.
    async fn registered(&self) -> Result<Vec<Arc<dyn ManagedService>>, RegistryError>;

    /// Initializes every registered service.
    async fn initialize_all(&self, ctx: &CancellationToken) -> Result<(), RegistryError>;

    /// Starts every registered service.
    async fn start_all(&self, ctx: &CancellationToken) -> Result<(), RegistryError>;

    /// Stops every registered service. Runs after cancellation, so it must not
    /// bail out on a cancelled token.
    async fn stop_all(&self, ctx: &CancellationToken) -> Result<(), RegistryError>;
}
