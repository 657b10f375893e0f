// Process-wide startup and shutdown sequencing.

use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::{Config, ConfigTrait};
use crate::orchestrator::Orchestrator;
use crate::registry::Registry;
use crate::resilience::{Callbacks, Resilience};
use crate::shutdown::GracefulShutdown;
use crate::telemetry::metrics;
use crate::watch::{WatchError, WatchLoop, WatchState};

const RESILIENCE_NAME: &str = "core";

type WatchTask = JoinHandle<Result<WatchState, WatchError>>;

/// What happened during shutdown. Every step runs even if an earlier one failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Terminal state of the watch loop, if it was running and exited in time.
    pub watch: Option<WatchState>,
    /// Managed services whose stop call failed.
    pub stop_failures: usize,
    pub registry_stopped: bool,
    pub resilience_released: bool,
}

/// Supervisor brackets the whole lifecycle: bulk startup, the watch task and
/// ordered shutdown (services before shared infrastructure).
pub struct Supervisor {
    cfg: Config,
    shutdown: GracefulShutdown,
    registry: Arc<dyn Registry>,
    resilience: Arc<Resilience>,
    orchestrator: Arc<Orchestrator>,
    watcher: Arc<WatchLoop>,
    watch_task: Mutex<Option<WatchTask>>,
    watch_exit: Mutex<Option<WatchState>>,
}

impl Supervisor {
    pub fn new(
        cfg: Config,
        shutdown: GracefulShutdown,
        registry: Arc<dyn Registry>,
        resilience: Arc<Resilience>,
    ) -> Self {
        let orchestrator = Arc::new(Orchestrator::new(registry.clone(), resilience.clone()));
        let watcher = Arc::new(WatchLoop::new(registry.clone(), orchestrator.clone()));
        Self {
            cfg,
            shutdown,
            registry,
            resilience,
            orchestrator,
            watcher,
            watch_task: Mutex::new(None),
            watch_exit: Mutex::new(None),
        }
    }

    /// Builds the resilience wrapper from config and wires breaker logging.
    pub fn build(cfg: Config, shutdown: GracefulShutdown, registry: Arc<dyn Registry>) -> Self {
        let resilience = Arc::new(Resilience::new(
            RESILIENCE_NAME,
            &cfg.resilience(),
            breaker_callbacks(),
        ));
        Self::new(cfg, shutdown, registry, resilience)
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    pub fn watch_state(&self) -> WatchState {
        self.watcher.state()
    }

    /// Bulk initialize/start of already-known services, discovery snapshot,
    /// then the watch task. Bulk failures abort startup.
    pub async fn start(&self) -> Result<()> {
        if self.watch_task.lock().is_some() {
            bail!("supervisor already started");
        }
        let token = self.shutdown.token();

        info!(component = "supervisor", "services are initializing...");
        self.registry
            .initialize_all(&token)
            .await
            .context("failed to initialize services")?;

        info!(component = "supervisor", "services are starting...");
        self.registry
            .start_all(&token)
            .await
            .context("failed to start services")?;

        let services = self
            .registry
            .registered()
            .await
            .context("failed to list started services")?;
        let adopted = self.orchestrator.adopt(services);
        info!(component = "supervisor", adopted, "bulk-started services are managed");

        self.log_discovered().await;

        info!(
            component = "supervisor",
            namespace = %self.cfg.namespace(),
            "starting service discovery and event handling..."
        );
        let watcher = self.watcher.clone();
        let namespace = self.cfg.namespace().to_string();
        let handle = tokio::spawn(async move { watcher.run(token, &namespace).await });
        *self.watch_task.lock() = Some(handle);

        info!(component = "supervisor", event = "started", "core service is running");
        Ok(())
    }

    // Read-only: nothing in the snapshot triggers a lifecycle action.
    async fn log_discovered(&self) {
        let token = self.shutdown.token();
        let namespace = self.cfg.discover_namespace();
        let registry = self.registry.as_ref();
        let token_ref = &token;

        match self
            .resilience
            .execute("discover", move || registry.discover(token_ref, namespace))
            .await
        {
            Ok(endpoints) => {
                for endpoint in &endpoints {
                    info!(
                        component = "supervisor",
                        service = %endpoint.name,
                        address = %endpoint.address,
                        "service discovered"
                    );
                }
                info!(
                    component = "supervisor",
                    namespace,
                    count = endpoints.len(),
                    "discovery snapshot taken"
                );
            }
            Err(e) => warn!(
                component = "supervisor",
                namespace,
                error = %e,
                "discovery snapshot failed"
            ),
        }
    }

    /// Waits for cancellation. A watch task ending early is logged; the
    /// process keeps running with stale membership until cancelled.
    pub async fn wait(&self) {
        let token = self.shutdown.token();
        let handle = self.watch_task.lock().take();

        let Some(mut handle) = handle else {
            token.cancelled().await;
            return;
        };

        let finished = tokio::select! {
            _ = token.cancelled() => None,
            res = &mut handle => Some(res),
        };

        match finished {
            None => *self.watch_task.lock() = Some(handle),
            Some(res) => {
                *self.watch_exit.lock() = log_watch_exit(res);
                token.cancelled().await;
            }
        }
    }

    /// Cancels, joins the watch task, stops managed and bulk services, then
    /// releases the resilience provider. Telemetry is left to the caller.
    pub async fn shutdown(&self) -> ShutdownReport {
        self.shutdown.trigger("supervisor");
        let token = self.shutdown.token();

        // An exit already observed by `wait` is reported as is.
        let mut watch = self.watch_exit.lock().take();
        let handle = self.watch_task.lock().take();
        if let Some(mut handle) = handle {
            match self.shutdown.run_with_timeout(&mut handle).await {
                Ok(res) => watch = log_watch_exit(res),
                Err(_) => {
                    warn!(component = "supervisor", "watch task did not exit in time, aborting");
                    handle.abort();
                    // Drain only once no dispatch can insert behind it.
                    let _ = handle.await;
                }
            }
        }

        info!(component = "supervisor", "shutting down services...");
        let stop_failures = self.orchestrator.retire_all().await;

        let registry_stopped = match self.registry.stop_all(&token).await {
            Ok(()) => true,
            Err(e) => {
                error!(component = "supervisor", error = %e, "failed to stop services");
                false
            }
        };

        info!(component = "supervisor", "shutting down resilience...");
        let resilience_released = match self.resilience.shutdown().await {
            Ok(()) => true,
            Err(e) => {
                error!(component = "supervisor", error = %e, "failed to shut down resilience");
                false
            }
        };

        info!(component = "supervisor", event = "stopped", "core shut down");
        ShutdownReport {
            watch,
            stop_failures,
            registry_stopped,
            resilience_released,
        }
    }
}

fn log_watch_exit(
    res: Result<Result<WatchState, WatchError>, tokio::task::JoinError>,
) -> Option<WatchState> {
    match res {
        Ok(Ok(state)) => {
            info!(component = "supervisor", state = state.as_str(), "watch task finished");
            Some(state)
        }
        Ok(Err(e)) => {
            error!(
                component = "supervisor",
                error = %e,
                "watch capability lost, service membership will go stale"
            );
            Some(WatchState::OpenFailed)
        }
        Err(e) => {
            error!(component = "supervisor", error = %e, "watch task panicked");
            None
        }
    }
}

/// Breaker transitions are logged and counted.
pub fn breaker_callbacks() -> Callbacks {
    Callbacks {
        on_open: Some(Arc::new(|name: &str| {
            metrics::add_breaker_transition("open");
            warn!(component = "resilience", name, "circuit breaker opened");
        })),
        on_close: Some(Arc::new(|name: &str| {
            metrics::add_breaker_transition("close");
            info!(component = "resilience", name, "circuit breaker closed");
        })),
    }
}
