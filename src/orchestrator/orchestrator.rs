//! Lifecycle orchestration driven by registry membership events.

use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::state::{Phase, ServiceStatus, State};
use crate::model::{Event, EventKind, ServiceEndpoint};
use crate::registry::Registry;
use crate::resilience::Resilience;
use crate::service::{ManagedService, UpdateOutcome};
use crate::telemetry::metrics;

/// Orchestrator owns the managed services and turns each event into lifecycle
/// calls. A failing step is logged and ends processing of that event only;
/// nothing is returned to the caller.
pub struct Orchestrator {
    registry: Arc<dyn Registry>,
    resilience: Arc<Resilience>,
    state: State,
}

impl Orchestrator {
    pub fn new(registry: Arc<dyn Registry>, resilience: Arc<Resilience>) -> Self {
        Self {
            registry,
            resilience,
            state: State::new(),
        }
    }

    /// Routes one event to its handler.
    pub async fn dispatch(&self, event: Event) {
        metrics::add_event(event.kind);
        match event.kind {
            EventKind::Added => self.on_added(&event.service).await,
            EventKind::Deleted => self.on_deleted(&event.service).await,
            EventKind::Modified => self.on_modified(&event.service).await,
        }
    }

    /// Create, register, initialize and start a service for the endpoint.
    pub async fn on_added(&self, endpoint: &ServiceEndpoint) {
        info!(
            component = "orchestrator",
            service = %endpoint.name,
            address = %endpoint.address,
            "adding service"
        );

        if self.state.contains(&endpoint.name) {
            warn!(
                component = "orchestrator",
                service = %endpoint.name,
                "service is already managed, add rejected"
            );
            return;
        }

        // A rejected endpoint is returned as a value so it is neither retried
        // nor counted against the shared breaker.
        let registry = self.registry.as_ref();
        let created = self
            .resilience
            .execute("create_service", move || async move {
                match registry.create_service(endpoint).await {
                    Err(e) if e.is_permanent() => Ok(Err(e)),
                    other => other.map(Ok),
                }
            })
            .await;
        let service = match created {
            Ok(Ok(service)) => service,
            Ok(Err(e)) => return report("create", &endpoint.name, &e),
            Err(e) => return report("create", &endpoint.name, &e),
        };

        if let Err(e) = self.registry.register(service.clone()).await {
            return report("register", service.name(), &e);
        }
        self.state
            .insert(endpoint.clone(), service.clone(), Phase::Registered);
        metrics::set_managed_services(self.state.len());

        // No rollback past this point: the service stays registered.
        if let Err(e) = service.initialize().await {
            return report("initialize", service.name(), &e);
        }
        self.state.set_phase(&endpoint.name, Phase::Initialized);

        if let Err(e) = service.start().await {
            return report("start", service.name(), &e);
        }
        self.state.set_phase(&endpoint.name, Phase::Running);

        info!(
            component = "orchestrator",
            service = %endpoint.name,
            event = "service_started",
            "service is running"
        );
    }

    /// Stop and forget the service. Unknown names are ignored.
    pub async fn on_deleted(&self, endpoint: &ServiceEndpoint) {
        info!(
            component = "orchestrator",
            service = %endpoint.name,
            address = %endpoint.address,
            "removing service"
        );

        match self.state.get(&endpoint.name) {
            Some((_, service)) => {
                self.retire(&endpoint.name, service).await;
            }
            None => debug!(
                component = "orchestrator",
                service = %endpoint.name,
                "service is not managed, nothing to remove"
            ),
        }
    }

    /// Applies the change in place when the service supports it, otherwise
    /// restarts it from the new endpoint.
    pub async fn on_modified(&self, endpoint: &ServiceEndpoint) {
        info!(
            component = "orchestrator",
            service = %endpoint.name,
            address = %endpoint.address,
            "modifying service"
        );

        let Some((current, service)) = self.state.get(&endpoint.name) else {
            warn!(
                component = "orchestrator",
                service = %endpoint.name,
                "modified service is not managed, adding it"
            );
            return self.on_added(endpoint).await;
        };

        if current == *endpoint {
            debug!(
                component = "orchestrator",
                service = %endpoint.name,
                "endpoint unchanged, skipping"
            );
            return;
        }

        let outcome = service.update(endpoint).await;
        match outcome {
            Ok(UpdateOutcome::Applied) => {
                self.state.set_endpoint(&endpoint.name, endpoint.clone());
                info!(
                    component = "orchestrator",
                    service = %endpoint.name,
                    from = %current.address,
                    to = %endpoint.address,
                    event = "service_updated",
                    "service updated in place"
                );
            }
            Ok(UpdateOutcome::RestartRequired) => {
                info!(
                    component = "orchestrator",
                    service = %endpoint.name,
                    "service cannot be updated in place, restarting"
                );
                self.retire(&endpoint.name, service).await;
                self.on_added(endpoint).await;
            }
            Err(e) => report("update", &endpoint.name, &e),
        }
    }

    /// Takes over services the registry already started in its bulk pass, so
    /// later events and shutdown treat them like any other managed service.
    /// No lifecycle call is made. Returns how many were adopted.
    pub fn adopt(&self, services: Vec<Arc<dyn ManagedService>>) -> usize {
        let mut adopted = 0;
        for service in services {
            let endpoint = service.endpoint();
            if self.state.contains(&endpoint.name) {
                continue;
            }
            debug!(
                component = "orchestrator",
                service = %endpoint.name,
                address = %endpoint.address,
                "adopting bulk-started service"
            );
            self.state.insert(endpoint, service, Phase::Running);
            adopted += 1;
        }
        metrics::set_managed_services(self.state.len());
        adopted
    }

    /// Stops and unregisters every managed service exactly once, continuing
    /// past failures. Returns the number of services that failed to stop.
    pub async fn retire_all(&self) -> usize {
        let services = self.state.drain();
        let total = services.len();
        let mut failed = 0;

        for (name, service) in services {
            if let Err(e) = service.stop().await {
                report("stop", &name, &e);
                failed += 1;
            }
            if let Err(e) = self.registry.unregister(&name).await {
                report("unregister", &name, &e);
            }
        }
        metrics::set_managed_services(0);

        info!(
            component = "orchestrator",
            event = "retired",
            total,
            failed,
            "managed services stopped"
        );
        failed
    }

    async fn retire(&self, name: &str, service: Arc<dyn ManagedService>) {
        if let Err(e) = service.stop().await {
            report("stop", name, &e);
        }
        self.state.remove(name);
        metrics::set_managed_services(self.state.len());

        if let Err(e) = self.registry.unregister(name).await {
            report("unregister", name, &e);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state.contains(name)
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    pub fn status(&self, name: &str) -> Option<ServiceStatus> {
        self.state.status(name)
    }

    pub fn snapshot(&self) -> Vec<ServiceStatus> {
        self.state.snapshot()
    }
}

fn report(step: &'static str, name: &str, err: &dyn Display) {
    metrics::add_lifecycle_failure(step);
    error!(
        component = "orchestrator",
        step,
        service = %name,
        error = %err,
        "lifecycle step failed"
    );
}
