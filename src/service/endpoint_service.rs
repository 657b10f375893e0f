// Default managed service materialized from a discovered endpoint.

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::api::{ManagedService, UpdateOutcome};
use super::error::ServiceError;
use crate::model::ServiceEndpoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Created,
    Initialized,
    Running,
    Stopped,
}

impl State {
    fn as_str(&self) -> &'static str {
        match self {
            State::Created => "created",
            State::Initialized => "initialized",
            State::Running => "running",
            State::Stopped => "stopped",
        }
    }
}

/// EndpointService tracks one remote endpoint. Address changes inside the
/// same namespace are applied in place; a namespace change needs a restart.
pub struct EndpointService {
    name: String,
    endpoint: Mutex<ServiceEndpoint>,
    state: Mutex<State>,
}

impl EndpointService {
    pub fn new(endpoint: ServiceEndpoint) -> Self {
        Self {
            name: endpoint.name.clone(),
            endpoint: Mutex::new(endpoint),
            state: Mutex::new(State::Created),
        }
    }

    pub fn state(&self) -> State {
        *self.state.lock()
    }

    fn invalid(&self, action: &'static str, state: State) -> ServiceError {
        ServiceError::InvalidTransition {
            name: self.name.clone(),
            action,
            phase: state.as_str(),
        }
    }
}

#[async_trait]
impl ManagedService for EndpointService {
    fn name(&self) -> &str {
        &self.name
    }

    fn endpoint(&self) -> ServiceEndpoint {
        self.endpoint.lock().clone()
    }

    async fn initialize(&self) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        match *state {
            State::Created | State::Stopped => {
                *state = State::Initialized;
                debug!(component = "endpoint-service", service = %self.name, "initialized");
                Ok(())
            }
            State::Initialized => Ok(()),
            State::Running => Err(self.invalid("initialize", *state)),
        }
    }

    async fn start(&self) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        match *state {
            State::Initialized | State::Stopped => {
                *state = State::Running;
                info!(
                    component = "endpoint-service",
                    service = %self.name,
                    address = %self.endpoint.lock().address,
                    "started"
                );
                Ok(())
            }
            // Bulk start followed by a live ADDED must stay harmless.
            State::Running => Ok(()),
            State::Created => Err(self.invalid("start", *state)),
        }
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        if *state == State::Running {
            *state = State::Stopped;
            info!(component = "endpoint-service", service = %self.name, "stopped");
        }
        Ok(())
    }

    async fn update(&self, endpoint: &ServiceEndpoint) -> Result<UpdateOutcome, ServiceError> {
        if endpoint.name != self.name {
            return Err(ServiceError::failed(
                &self.name,
                format!("update addressed to {}", endpoint.name),
            ));
        }

        let mut current = self.endpoint.lock();
        if current.namespace != endpoint.namespace {
            return Ok(UpdateOutcome::RestartRequired);
        }

        info!(
            component = "endpoint-service",
            service = %self.name,
            from = %current.address,
            to = %endpoint.address,
            "address updated"
        );
        *current = endpoint.clone();
        Ok(UpdateOutcome::Applied)
    }
}
