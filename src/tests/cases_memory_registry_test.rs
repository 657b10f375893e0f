use std::sync::Arc;

use crate::config::{self, Config, ConfigTrait};
use crate::model::{Event, ServiceEndpoint};
use crate::orchestrator::{Orchestrator, Phase};
use crate::registry::MemoryRegistry;
use crate::resilience::{BreakerState, Callbacks, Resilience};
use crate::shutdown::GracefulShutdown;
use crate::supervisor::Supervisor;
use crate::tests::support::{eventually, NS};
use crate::watch::WatchState;

fn endpoint(name: &str, address: &str) -> ServiceEndpoint {
    ServiceEndpoint::new(name, address, NS)
}

#[tokio::test]
async fn test_end_to_end_with_memory_registry() {
    let mut cfg = config::new_test_config();
    cfg.core.services = vec![config::SeedService {
        name: "seed".to_string(),
        address: "10.0.0.9:80".to_string(),
        namespace: None,
    }];
    let registry = Arc::new(MemoryRegistry::seeded(cfg.seed_endpoints()).await.unwrap());
    let token = tokio_util::sync::CancellationToken::new();
    let gsh = GracefulShutdown::new(token.clone(), cfg.shutdown_timeout());
    let sup = Supervisor::build(cfg, gsh, registry.clone());

    sup.start().await.unwrap();
    let watcher_ready = {
        let sup = &sup;
        eventually(move || sup.watch_state() == WatchState::Running).await
    };
    assert!(watcher_ready);

    registry
        .publish(Event::added(endpoint("billing", "10.0.0.1:80")))
        .await;
    let orch = sup.orchestrator().clone();
    assert!(eventually(move || orch.status("billing").map(|s| s.phase) == Some(Phase::Running)).await);

    registry
        .publish(Event::modified(endpoint("billing", "10.0.0.2:80")))
        .await;
    let orch = sup.orchestrator().clone();
    assert!(
        eventually(move || orch
            .status("billing")
            .map(|s| s.endpoint.address == "10.0.0.2:80")
            .unwrap_or(false))
        .await
    );

    registry
        .publish(Event::deleted(endpoint("billing", "10.0.0.2:80")))
        .await;
    let orch = sup.orchestrator().clone();
    assert!(eventually(move || !orch.contains("billing")).await);
    assert!(!registry.is_registered("billing"));
    assert!(registry.is_registered("seed"));

    let report = sup.shutdown().await;
    assert_eq!(report.stop_failures, 0);
    assert!(report.registry_stopped);
    assert!(report.resilience_released);
}

async fn seeded_supervisor() -> (Arc<MemoryRegistry>, Supervisor) {
    let mut cfg = config::new_test_config();
    cfg.core.services = vec![config::SeedService {
        name: "seed".to_string(),
        address: "10.0.0.9:80".to_string(),
        namespace: None,
    }];
    let registry = Arc::new(MemoryRegistry::seeded(cfg.seed_endpoints()).await.unwrap());
    let gsh = GracefulShutdown::new(
        tokio_util::sync::CancellationToken::new(),
        cfg.shutdown_timeout(),
    );
    let sup = Supervisor::build(cfg, gsh, registry.clone());
    tokio_test::assert_ok!(sup.start().await);
    (registry, sup)
}

#[tokio::test]
async fn test_bulk_started_seed_follows_live_modify_and_delete() {
    let (registry, sup) = seeded_supervisor().await;
    let orch = sup.orchestrator().clone();
    assert_eq!(orch.status("seed").map(|s| s.phase), Some(Phase::Running));

    orch.on_modified(&endpoint("seed", "10.0.0.10:80")).await;
    assert_eq!(
        orch.status("seed").map(|s| s.endpoint.address),
        Some("10.0.0.10:80".to_string())
    );
    assert!(registry.is_registered("seed"));

    orch.on_deleted(&endpoint("seed", "10.0.0.10:80")).await;
    assert!(!orch.contains("seed"));
    assert!(!registry.is_registered("seed"));

    let report = sup.shutdown().await;
    assert_eq!(report.stop_failures, 0);
}

#[tokio::test]
async fn test_bulk_started_seed_readded_live_is_rejected() {
    let (registry, sup) = seeded_supervisor().await;

    sup.orchestrator()
        .on_added(&endpoint("seed", "10.0.0.9:80"))
        .await;

    assert!(sup.orchestrator().contains("seed"));
    assert!(registry.is_registered("seed"));
    sup.shutdown().await;
    assert!(!registry.is_registered("seed"));
}

#[tokio::test]
async fn test_malformed_endpoints_do_not_open_the_breaker() {
    let cfg = tokio_test::assert_ok!(Config::load("cfg/core.cfg.yaml"));
    let registry = Arc::new(MemoryRegistry::new());
    let resilience = Arc::new(Resilience::new("core", &cfg.resilience(), Callbacks::default()));
    let orch = Orchestrator::new(registry.clone(), resilience.clone());

    for name in ["bad-1", "bad-2", "bad-3", "bad-4", "bad-5", "bad-6"] {
        orch.on_added(&endpoint(name, "")).await;
    }
    orch.on_added(&endpoint("good", "10.0.0.1:80")).await;

    assert_eq!(resilience.breaker_state(), BreakerState::Closed);
    assert_eq!(orch.status("good").map(|s| s.phase), Some(Phase::Running));
    assert_eq!(orch.len(), 1);
    assert!(registry.is_registered("good"));
}
