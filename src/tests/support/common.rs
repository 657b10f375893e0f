// Builders shared by the scenario tests.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::{self, ConfigTrait};
use crate::model::ServiceEndpoint;
use crate::orchestrator::Orchestrator;
use crate::registry::Registry;
use crate::resilience::{Callbacks, Resilience};
use crate::shutdown::GracefulShutdown;
use crate::supervisor::Supervisor;

pub const NS: &str = "default";

pub fn ep(name: &str) -> ServiceEndpoint {
    ServiceEndpoint::new(name, format!("{name}.svc:8080"), NS)
}

pub fn ep_at(name: &str, address: &str) -> ServiceEndpoint {
    ServiceEndpoint::new(name, address, NS)
}

pub fn test_resilience() -> Arc<Resilience> {
    let cfg = config::new_test_config();
    Arc::new(Resilience::new("test", &cfg.resilience(), Callbacks::default()))
}

pub fn orchestrator_over(registry: Arc<dyn Registry>) -> Arc<Orchestrator> {
    Arc::new(Orchestrator::new(registry, test_resilience()))
}

pub fn supervisor_over(
    registry: Arc<dyn Registry>,
    resilience: Arc<Resilience>,
) -> (Supervisor, CancellationToken) {
    let cfg = config::new_test_config();
    let token = CancellationToken::new();
    let gsh = GracefulShutdown::new(token.clone(), Duration::from_secs(2));
    (Supervisor::new(cfg, gsh, registry, resilience), token)
}

/// Polls until the predicate holds or the deadline passes.
pub async fn eventually<F>(mut predicate: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    predicate()
}
