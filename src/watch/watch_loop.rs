//! Bridges a registry watch stream to the orchestrator.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::orchestrator::Orchestrator;
use crate::registry::{Registry, RegistryError};
use crate::telemetry::metrics;

/// Lifecycle of one watch stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Init,
    Opening,
    Running,
    /// Context cancelled. Terminal, clean.
    Cancelled,
    /// Stream ended without cancellation. Terminal, clean.
    Closed,
    /// Stream could not be opened. Terminal, fatal to watching.
    OpenFailed,
}

impl WatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchState::Init => "init",
            WatchState::Opening => "opening",
            WatchState::Running => "running",
            WatchState::Cancelled => "cancelled",
            WatchState::Closed => "closed",
            WatchState::OpenFailed => "open_failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WatchState::Cancelled | WatchState::Closed | WatchState::OpenFailed
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("watch: cannot open stream for namespace {namespace}: {source}")]
    Open {
        namespace: String,
        #[source]
        source: RegistryError,
    },
}

/// WatchLoop opens the stream once and dispatches events one at a time, in
/// arrival order. A slow handler delays the next event.
pub struct WatchLoop {
    registry: Arc<dyn Registry>,
    orchestrator: Arc<Orchestrator>,
    state: Mutex<WatchState>,
}

impl WatchLoop {
    pub fn new(registry: Arc<dyn Registry>, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            registry,
            orchestrator,
            state: Mutex::new(WatchState::Init),
        }
    }

    pub fn state(&self) -> WatchState {
        *self.state.lock()
    }

    fn set_state(&self, state: WatchState) {
        *self.state.lock() = state;
    }

    fn finish(&self, state: WatchState) -> WatchState {
        self.set_state(state);
        metrics::add_watch_exit(state);
        state
    }

    /// Runs until cancellation or stream closure. Only a failure to open the
    /// stream is returned as an error.
    pub async fn run(&self, ctx: CancellationToken, namespace: &str) -> Result<WatchState, WatchError> {
        if ctx.is_cancelled() {
            info!(component = "watch", namespace, "cancelled before watching");
            return Ok(self.finish(WatchState::Cancelled));
        }

        self.set_state(WatchState::Opening);
        let mut events = match self.registry.watch(&ctx, namespace).await {
            Ok(events) => events,
            Err(source) => {
                error!(
                    component = "watch",
                    namespace,
                    error = %source,
                    "failed to start service watcher"
                );
                self.finish(WatchState::OpenFailed);
                return Err(WatchError::Open {
                    namespace: namespace.to_string(),
                    source,
                });
            }
        };

        self.set_state(WatchState::Running);
        info!(component = "watch", namespace, event = "watching", "service watcher started");

        let exit = loop {
            tokio::select! {
                // Cancellation wins over a ready event.
                biased;
                _ = ctx.cancelled() => {
                    info!(component = "watch", namespace, "stopping service watcher");
                    break WatchState::Cancelled;
                }
                next = events.recv() => match next {
                    Some(event) => self.orchestrator.dispatch(event).await,
                    None => {
                        warn!(component = "watch", namespace, "service watcher channel closed");
                        break WatchState::Closed;
                    }
                },
            }
        };

        Ok(self.finish(exit))
    }
}
