// Registry fake: a hand-fed event stream plus journaled CRUD calls.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::model::{Event, ServiceEndpoint};
use crate::registry::{Registry, RegistryError};
use crate::service::ManagedService;

use super::journal::Journal;
use super::service::{Behavior, Faults, RecordingService};

pub struct FakeRegistry {
    pub journal: Journal,
    pub faults: Faults,
    behavior: Mutex<Behavior>,
    events: Mutex<Option<mpsc::Receiver<Event>>>,
    known: Mutex<Vec<ServiceEndpoint>>,
    registered: Mutex<BTreeMap<String, Arc<dyn ManagedService>>>,
}

impl FakeRegistry {
    /// Returns the registry and the sending side of its single watch stream.
    pub fn new() -> (Arc<Self>, mpsc::Sender<Event>) {
        let (tx, rx) = mpsc::channel(64);
        let registry = Arc::new(Self {
            journal: Journal::new(),
            faults: Faults::default(),
            behavior: Mutex::new(Behavior::default()),
            events: Mutex::new(Some(rx)),
            known: Mutex::new(Vec::new()),
            registered: Mutex::new(BTreeMap::new()),
        });
        (registry, tx)
    }

    /// A registry whose watch stream cannot be opened.
    pub fn without_stream() -> Arc<Self> {
        let (registry, _) = Self::new();
        registry.events.lock().take();
        registry
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock() = behavior;
    }

    pub fn set_known(&self, endpoints: Vec<ServiceEndpoint>) {
        *self.known.lock() = endpoints;
    }

    /// Registers a service directly, as if it was known before watching.
    pub fn preload(&self, endpoint: &ServiceEndpoint) {
        let service = self.make(endpoint);
        self.registered
            .lock()
            .insert(endpoint.name.clone(), service);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registered.lock().contains_key(name)
    }

    fn make(&self, endpoint: &ServiceEndpoint) -> Arc<dyn ManagedService> {
        Arc::new(RecordingService::new(
            endpoint,
            self.journal.clone(),
            self.faults.clone(),
            self.behavior.lock().clone(),
        ))
    }

    fn check(&self, key: &str, name: &str) -> Result<(), RegistryError> {
        if self.faults.should_fail(name, key) {
            return Err(RegistryError::Create {
                name: name.to_string(),
                reason: format!("{key} refused"),
            });
        }
        Ok(())
    }

    fn registered_services(&self) -> Vec<Arc<dyn ManagedService>> {
        self.registered.lock().values().cloned().collect()
    }
}

#[async_trait]
impl Registry for FakeRegistry {
    async fn watch(
        &self,
        _ctx: &CancellationToken,
        namespace: &str,
    ) -> Result<mpsc::Receiver<Event>, RegistryError> {
        self.journal.push(format!("registry:watch:{namespace}"));
        self.events
            .lock()
            .take()
            .ok_or_else(|| RegistryError::WatchUnavailable {
                namespace: namespace.to_string(),
                reason: "no stream".to_string(),
            })
    }

    async fn discover(
        &self,
        _ctx: &CancellationToken,
        namespace: &str,
    ) -> Result<Vec<ServiceEndpoint>, RegistryError> {
        self.journal.push(format!("registry:discover:{namespace}"));
        self.check("discover", "registry")?;
        Ok(self.known.lock().clone())
    }

    async fn create_service(
        &self,
        endpoint: &ServiceEndpoint,
    ) -> Result<Arc<dyn ManagedService>, RegistryError> {
        self.journal.push(format!("registry:create:{}", endpoint.name));
        if self.faults.should_fail(&endpoint.name, "create-unavailable") {
            return Err(RegistryError::Closed);
        }
        self.check("create", &endpoint.name)?;
        Ok(self.make(endpoint))
    }

    async fn register(&self, service: Arc<dyn ManagedService>) -> Result<(), RegistryError> {
        let name = service.name().to_string();
        self.journal.push(format!("registry:register:{name}"));
        self.check("register", &name)?;
        let mut registered = self.registered.lock();
        if registered.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        registered.insert(name, service);
        Ok(())
    }

    async fn unregister(&self, name: &str) -> Result<(), RegistryError> {
        self.journal.push(format!("registry:unregister:{name}"));
        match self.registered.lock().remove(name) {
            Some(_) => Ok(()),
            None => Err(RegistryError::NotFound(name.to_string())),
        }
    }

    async fn registered(&self) -> Result<Vec<Arc<dyn ManagedService>>, RegistryError> {
        self.journal.push("registry:registered");
        self.check("registered", "registry")?;
        Ok(self.registered_services())
    }

    async fn initialize_all(&self, _ctx: &CancellationToken) -> Result<(), RegistryError> {
        self.journal.push("registry:initialize_all");
        self.check("initialize_all", "registry")?;
        for srv in self.registered_services() {
            srv.initialize().await?;
        }
        Ok(())
    }

    async fn start_all(&self, _ctx: &CancellationToken) -> Result<(), RegistryError> {
        self.journal.push("registry:start_all");
        self.check("start_all", "registry")?;
        for srv in self.registered_services() {
            srv.start().await?;
        }
        Ok(())
    }

    async fn stop_all(&self, _ctx: &CancellationToken) -> Result<(), RegistryError> {
        self.journal.push("registry:stop_all");
        let mut failed = 0;
        let services = self.registered_services();
        for srv in &services {
            if srv.stop().await.is_err() {
                failed += 1;
            }
        }
        if failed > 0 {
            return Err(RegistryError::Bulk {
                action: "stop",
                failed,
                total: services.len(),
            });
        }
        Ok(())
    }
}
