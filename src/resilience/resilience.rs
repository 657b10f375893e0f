//! Retry, rate-limit and circuit-breaker wrapper for calls to unreliable dependencies.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::breaker::{Breaker, Callbacks, State};
use super::error::ResilienceError;
use crate::config;

pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(100);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(2);
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_RESET_TIMEOUT: Duration = Duration::from_secs(30);

pub type RetryPredicate = Arc<dyn Fn(&anyhow::Error) -> bool + Send + Sync>;

/// Resilience wraps calls with retries (exponential backoff), an optional
/// call-rate limit and a circuit breaker shared by every call.
pub struct Resilience {
    name: String,
    max_retries: u32,
    backoff: Duration,
    max_backoff: Duration,
    limiter: Option<DefaultDirectRateLimiter>,
    breaker: Breaker,
    retry_if: RetryPredicate,
    shut_down: AtomicBool,
}

impl Resilience {
    pub fn new(name: impl Into<String>, cfg: &config::Resilience, callbacks: Callbacks) -> Self {
        let name = name.into();
        let threshold = cfg
            .breaker
            .as_ref()
            .and_then(|b| b.failure_threshold)
            .unwrap_or(DEFAULT_FAILURE_THRESHOLD);
        let reset_timeout = cfg
            .breaker
            .as_ref()
            .and_then(|b| b.reset_timeout)
            .unwrap_or(DEFAULT_RESET_TIMEOUT);
        let limiter = cfg
            .rate_per_sec
            .and_then(NonZeroU32::new)
            .map(|rate| RateLimiter::direct(Quota::per_second(rate)));

        Self {
            breaker: Breaker::new(name.clone(), threshold, reset_timeout, callbacks),
            name,
            max_retries: cfg.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            backoff: cfg.backoff.unwrap_or(DEFAULT_BACKOFF),
            max_backoff: cfg.max_backoff.unwrap_or(DEFAULT_MAX_BACKOFF),
            limiter,
            // Retry on all errors unless told otherwise.
            retry_if: Arc::new(|_| true),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Restricts retries to errors accepted by the predicate.
    pub fn with_retry_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&anyhow::Error) -> bool + Send + Sync + 'static,
    {
        self.retry_if = Arc::new(predicate);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn breaker_state(&self) -> State {
        self.breaker.state()
    }

    /// Runs `call` until it succeeds, retries are exhausted, the predicate
    /// rejects the error or the breaker opens.
    pub async fn execute<T, E, F, Fut>(&self, op: &str, mut call: F) -> Result<T, ResilienceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<anyhow::Error>,
    {
        let mut attempt: u32 = 0;
        loop {
            if self.shut_down.load(Ordering::Acquire) {
                return Err(ResilienceError::ShutDown {
                    name: self.name.clone(),
                });
            }
            if !self.breaker.allow() {
                return Err(ResilienceError::CircuitOpen {
                    name: self.name.clone(),
                });
            }
            if let Some(limiter) = &self.limiter {
                limiter.until_ready().await;
            }

            attempt += 1;
            match call().await {
                Ok(value) => {
                    self.breaker.on_success();
                    return Ok(value);
                }
                Err(e) => {
                    self.breaker.on_failure();
                    let err: anyhow::Error = e.into();
                    if attempt > self.max_retries || !(self.retry_if)(&err) {
                        return Err(ResilienceError::Exhausted {
                            op: op.to_string(),
                            attempts: attempt,
                            source: err,
                        });
                    }

                    let delay = self.delay(attempt);
                    debug!(
                        component = "resilience",
                        name = %self.name,
                        op,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying call"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.backoff.saturating_mul(factor).min(self.max_backoff)
    }

    /// Rejects every later call. A second shutdown is reported as an error.
    pub async fn shutdown(&self) -> Result<(), ResilienceError> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Err(ResilienceError::ShutDown {
                name: self.name.clone(),
            });
        }
        info!(component = "resilience", name = %self.name, event = "shutdown", "resilience shut down");
        Ok(())
    }
}
