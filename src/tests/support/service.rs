// Managed service fake that journals every lifecycle call.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use crate::model::ServiceEndpoint;
use crate::resilience::Resilience;
use crate::service::{ManagedService, ServiceError, UpdateOutcome};

use super::journal::Journal;

/// Steps that should fail, as "name:step" keys.
#[derive(Clone, Default)]
pub struct Faults {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl Faults {
    pub fn fail(&self, name: &str, step: &str) {
        self.keys.lock().insert(format!("{name}:{step}"));
    }

    pub fn should_fail(&self, name: &str, step: &str) -> bool {
        self.keys.lock().contains(&format!("{name}:{step}"))
    }
}

/// Knobs shared by every service a fake registry creates.
#[derive(Clone)]
pub struct Behavior {
    pub update: UpdateOutcome,
    /// Delay applied inside `start`.
    pub start_delay: Option<Duration>,
    /// When set, `stop` records whether the resilience provider still serves calls.
    pub resilience_check: Option<Arc<Resilience>>,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            update: UpdateOutcome::Applied,
            start_delay: None,
            resilience_check: None,
        }
    }
}

pub struct RecordingService {
    name: String,
    endpoint: Mutex<ServiceEndpoint>,
    journal: Journal,
    faults: Faults,
    behavior: Behavior,
}

impl RecordingService {
    pub fn new(endpoint: &ServiceEndpoint, journal: Journal, faults: Faults, behavior: Behavior) -> Self {
        Self {
            name: endpoint.name.clone(),
            endpoint: Mutex::new(endpoint.clone()),
            journal,
            faults,
            behavior,
        }
    }

    fn step(&self, step: &str) -> Result<(), ServiceError> {
        self.journal.push(format!("{}:{}", self.name, step));
        if self.faults.should_fail(&self.name, step) {
            return Err(ServiceError::failed(&self.name, format!("{step} refused")));
        }
        Ok(())
    }
}

#[async_trait]
impl ManagedService for RecordingService {
    fn name(&self) -> &str {
        &self.name
    }

    fn endpoint(&self) -> ServiceEndpoint {
        self.endpoint.lock().clone()
    }

    async fn initialize(&self) -> Result<(), ServiceError> {
        self.step("initialize")
    }

    async fn start(&self) -> Result<(), ServiceError> {
        if let Some(delay) = self.behavior.start_delay {
            tokio::time::sleep(delay).await;
        }
        self.step("start")
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        if let Some(resilience) = &self.behavior.resilience_check {
            let guarded = resilience
                .execute("stop-check", || async { Ok::<_, Infallible>(()) })
                .await
                .is_ok();
            self.journal
                .push(format!("{}:stop:{}", self.name, if guarded { "guarded" } else { "unguarded" }));
        }
        self.step("stop")
    }

    async fn update(&self, endpoint: &ServiceEndpoint) -> Result<UpdateOutcome, ServiceError> {
        self.journal
            .push(format!("{}:update:{}", self.name, endpoint.address));
        if self.faults.should_fail(&self.name, "update") {
            return Err(ServiceError::failed(&self.name, "update refused"));
        }
        if self.behavior.update == UpdateOutcome::Applied {
            *self.endpoint.lock() = endpoint.clone();
        }
        Ok(self.behavior.update)
    }
}
