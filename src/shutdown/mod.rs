// Package shutdown provides graceful shutdown functionality.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};


#[derive(Debug, thiserror::Error)]
#[error("graceful shutdown timeout exceeded")]
pub struct TimeoutError;

/// GracefulShutdown holds the single cancellation authority of the process.
/// OS signals and callers funnel into `trigger`, which cancels exactly once.
#[derive(Clone)]
pub struct GracefulShutdown {
    shutdown_token: CancellationToken,
    timeout: Duration,
    triggered: Arc<AtomicBool>,
}

impl GracefulShutdown {
    /// Creates a new graceful shutdown handler
    pub fn new(shutdown_token: CancellationToken, timeout: Duration) -> Self {
        Self {
            shutdown_token,
            timeout,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Cancels the token. Returns false if cancellation already happened.
    pub fn trigger(&self, reason: &'static str) -> bool {
        if self.triggered.swap(true, Ordering::AcqRel) {
            return false;
        }
        info!(
            component = "graceful-shutdown",
            event = "cancellation_started",
            reason,
            "cancellation started"
        );
        self.shutdown_token.cancel();
        true
    }

    /// Waits for SIGINT, SIGTERM or an external cancellation, then cancels.
    pub async fn wait_for_signal(&self) {
        tokio::select! {
            _ = interrupt() => {
                self.trigger("SIGINT");
            }
            _ = terminate() => {
                self.trigger("SIGTERM");
            }
            _ = self.shutdown_token.cancelled() => {
                self.trigger("ctx_done");
            }
        }
    }

    /// Spawns the signal listener.
    pub fn listen(&self) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.wait_for_signal().await })
    }

    /// Bounds a shutdown step by the configured timeout.
    pub async fn run_with_timeout<F, T>(&self, fut: F) -> Result<T, TimeoutError>
    where
        F: Future<Output = T>,
    {
        match timeout(self.timeout, fut).await {
            Ok(v) => {
                info!(
                    component = "graceful-shutdown",
                    event = "shutdown_success",
                    "service was gracefully shut down"
                );
                Ok(v)
            }
            Err(_) => {
                warn!(
                    component = "graceful-shutdown",
                    event = "shutdown_timeout",
                    timeout_secs = self.timeout.as_secs(),
                    "not all tasks were closed within timeout"
                );
                Err(TimeoutError)
            }
        }
    }
}

async fn interrupt() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(component = "graceful-shutdown", error = %e, "cannot listen for SIGINT");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut sig) => {
            sig.recv().await;
        }
        Err(e) => {
            warn!(component = "graceful-shutdown", error = %e, "cannot listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
