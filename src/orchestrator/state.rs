//! Name-keyed bookkeeping of managed services.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::model::ServiceEndpoint;
use crate::service::ManagedService;

/// How far a managed service got through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Registered, initialize failed or has not run.
    Registered,
    /// Initialized, start failed.
    Initialized,
    Running,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Registered => "registered",
            Phase::Initialized => "initialized",
            Phase::Running => "running",
        }
    }
}

struct Entry {
    endpoint: ServiceEndpoint,
    service: Arc<dyn ManagedService>,
    phase: Phase,
}

/// Read-only view of one managed service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    pub endpoint: ServiceEndpoint,
    pub phase: Phase,
}

/// State is written only by event dispatch and shutdown; readers may query it
/// concurrently. Guards are never held across an await.
#[derive(Default)]
pub struct State {
    entries: RwLock<HashMap<String, Entry>>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, endpoint: ServiceEndpoint, service: Arc<dyn ManagedService>, phase: Phase) {
        self.entries.write().insert(
            endpoint.name.clone(),
            Entry {
                endpoint,
                service,
                phase,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<(ServiceEndpoint, Arc<dyn ManagedService>)> {
        self.entries
            .read()
            .get(name)
            .map(|e| (e.endpoint.clone(), e.service.clone()))
    }

    pub fn set_phase(&self, name: &str, phase: Phase) {
        if let Some(e) = self.entries.write().get_mut(name) {
            e.phase = phase;
        }
    }

    pub fn set_endpoint(&self, name: &str, endpoint: ServiceEndpoint) {
        if let Some(e) = self.entries.write().get_mut(name) {
            e.endpoint = endpoint;
        }
    }

    pub fn remove(&self, name: &str) -> bool {
        self.entries.write().remove(name).is_some()
    }

    /// Empties the map, returning services ordered by name.
    pub fn drain(&self) -> Vec<(String, Arc<dyn ManagedService>)> {
        let mut drained: Vec<_> = self
            .entries
            .write()
            .drain()
            .map(|(name, e)| (name, e.service))
            .collect();
        drained.sort_by(|a, b| a.0.cmp(&b.0));
        drained
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn status(&self, name: &str) -> Option<ServiceStatus> {
        self.entries.read().get(name).map(|e| ServiceStatus {
            endpoint: e.endpoint.clone(),
            phase: e.phase,
        })
    }

    /// Returns every managed service ordered by name.
    pub fn snapshot(&self) -> Vec<ServiceStatus> {
        let mut all: Vec<_> = self
            .entries
            .read()
            .values()
            .map(|e| ServiceStatus {
                endpoint: e.endpoint.clone(),
                phase: e.phase,
            })
            .collect();
        all.sort_by(|a, b| a.endpoint.name.cmp(&b.endpoint.name));
        all
    }
}
