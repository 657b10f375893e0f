//! In-process registry provider backed by the configured endpoint list.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::api::Registry;
use super::error::RegistryError;
use crate::model::{Event, EventKind, ServiceEndpoint};
use crate::service::{EndpointService, ManagedService, ServiceError};

const DEFAULT_WATCH_BUFFER: usize = 64;

struct Watcher {
    namespace: String,
    tx: mpsc::Sender<Event>,
}

/// MemoryRegistry keeps known endpoints and registered services in memory and
/// fans published events out to every open watch stream of the namespace.
pub struct MemoryRegistry {
    endpoints: RwLock<HashMap<String, ServiceEndpoint>>,
    services: Mutex<BTreeMap<String, Arc<dyn ManagedService>>>,
    watchers: Mutex<Vec<Watcher>>,
    buffer: usize,
    closed: AtomicBool,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_WATCH_BUFFER)
    }

    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            endpoints: RwLock::new(HashMap::new()),
            services: Mutex::new(BTreeMap::new()),
            watchers: Mutex::new(Vec::new()),
            buffer: buffer.max(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Builds a registry whose seed endpoints are already materialized and
    /// registered, ready for the bulk initialize/start pass.
    pub async fn seeded(endpoints: Vec<ServiceEndpoint>) -> Result<Self, RegistryError> {
        let registry = Self::new();
        for endpoint in endpoints {
            let service = registry.create_service(&endpoint).await?;
            registry.register(service).await?;
            registry
                .endpoints
                .write()
                .insert(endpoint.name.clone(), endpoint);
        }
        Ok(registry)
    }

    /// Records the change and delivers it to every watcher of the endpoint's
    /// namespace. Returns how many streams received the event.
    pub async fn publish(&self, event: Event) -> usize {
        {
            let mut endpoints = self.endpoints.write();
            match event.kind {
                EventKind::Added | EventKind::Modified => {
                    endpoints.insert(event.service.name.clone(), event.service.clone());
                }
                EventKind::Deleted => {
                    endpoints.remove(&event.service.name);
                }
            }
        }

        let targets: Vec<mpsc::Sender<Event>> = {
            let mut watchers = self.watchers.lock();
            watchers.retain(|w| !w.tx.is_closed());
            watchers
                .iter()
                .filter(|w| w.namespace == event.service.namespace)
                .map(|w| w.tx.clone())
                .collect()
        };

        let mut delivered = 0;
        for tx in targets {
            if tx.send(event.clone()).await.is_ok() {
                delivered += 1;
            }
        }

        debug!(
            component = "memory-registry",
            kind = %event.kind,
            service = %event.service.name,
            delivered,
            "event published"
        );
        delivered
    }

    /// Closes every open watch stream; later `watch` calls fail.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.watchers.lock().clear();
        info!(component = "memory-registry", event = "closed", "registry closed");
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.services.lock().contains_key(name)
    }

    fn list_services(&self) -> Vec<Arc<dyn ManagedService>> {
        self.services.lock().values().cloned().collect()
    }

    fn bulk_result(action: &'static str, failed: usize, total: usize) -> Result<(), RegistryError> {
        if failed == 0 {
            Ok(())
        } else {
            Err(RegistryError::Bulk {
                action,
                failed,
                total,
            })
        }
    }

    fn report(action: &'static str, name: &str, err: &ServiceError) {
        error!(
            component = "memory-registry",
            action,
            service = %name,
            error = %err,
            "bulk action failed for service"
        );
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn watch(
        &self,
        ctx: &CancellationToken,
        namespace: &str,
    ) -> Result<mpsc::Receiver<Event>, RegistryError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RegistryError::WatchUnavailable {
                namespace: namespace.to_string(),
                reason: RegistryError::Closed.to_string(),
            });
        }
        if ctx.is_cancelled() {
            return Err(RegistryError::Cancelled);
        }

        let (tx, rx) = mpsc::channel(self.buffer);
        self.watchers.lock().push(Watcher {
            namespace: namespace.to_string(),
            tx,
        });
        Ok(rx)
    }

    async fn discover(
        &self,
        ctx: &CancellationToken,
        namespace: &str,
    ) -> Result<Vec<ServiceEndpoint>, RegistryError> {
        if ctx.is_cancelled() {
            return Err(RegistryError::Cancelled);
        }

        let mut found: Vec<ServiceEndpoint> = self
            .endpoints
            .read()
            .values()
            .filter(|e| e.namespace == namespace)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    async fn create_service(
        &self,
        endpoint: &ServiceEndpoint,
    ) -> Result<Arc<dyn ManagedService>, RegistryError> {
        if endpoint.name.is_empty() {
            return Err(RegistryError::Create {
                name: endpoint.name.clone(),
                reason: "empty service name".to_string(),
            });
        }
        if endpoint.address.is_empty() {
            return Err(RegistryError::Create {
                name: endpoint.name.clone(),
                reason: "empty address".to_string(),
            });
        }
        Ok(Arc::new(EndpointService::new(endpoint.clone())))
    }

    async fn register(&self, service: Arc<dyn ManagedService>) -> Result<(), RegistryError> {
        let mut services = self.services.lock();
        let name = service.name().to_string();
        if services.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        services.insert(name, service);
        Ok(())
    }

    async fn unregister(&self, name: &str) -> Result<(), RegistryError> {
        match self.services.lock().remove(name) {
            Some(_) => Ok(()),
            None => Err(RegistryError::NotFound(name.to_string())),
        }
    }

    async fn registered(&self) -> Result<Vec<Arc<dyn ManagedService>>, RegistryError> {
        Ok(self.list_services())
    }

    async fn initialize_all(&self, ctx: &CancellationToken) -> Result<(), RegistryError> {
        let services = self.list_services();
        let mut failed = 0;
        for srv in &services {
            if ctx.is_cancelled() {
                return Err(RegistryError::Cancelled);
            }
            if let Err(e) = srv.initialize().await {
                Self::report("initialize", srv.name(), &e);
                failed += 1;
            }
        }
        Self::bulk_result("initialize", failed, services.len())
    }

    async fn start_all(&self, ctx: &CancellationToken) -> Result<(), RegistryError> {
        let services = self.list_services();
        let mut failed = 0;
        for srv in &services {
            if ctx.is_cancelled() {
                return Err(RegistryError::Cancelled);
            }
            if let Err(e) = srv.start().await {
                Self::report("start", srv.name(), &e);
                failed += 1;
            }
        }
        Self::bulk_result("start", failed, services.len())
    }

    async fn stop_all(&self, _ctx: &CancellationToken) -> Result<(), RegistryError> {
        let services = self.list_services();
        let mut failed = 0;
        for srv in &services {
            if let Err(e) = srv.stop().await {
                Self::report("stop", srv.name(), &e);
                failed += 1;
            }
        }
        if failed > 0 {
            warn!(
                component = "memory-registry",
                failed,
                total = services.len(),
                "not every service stopped cleanly"
            );
        }
        Self::bulk_result("stop", failed, services.len())
    }
}
