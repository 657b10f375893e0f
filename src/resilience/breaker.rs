//! Consecutive-failure circuit breaker with open/close notifications.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub type TransitionFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Hooks fired when the breaker changes state.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub on_open: Option<TransitionFn>,
    pub on_close: Option<TransitionFn>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: State,
    failures: u32,
    opened_at: Option<Instant>,
}

pub struct Breaker {
    name: String,
    threshold: u32,
    reset_timeout: Duration,
    inner: Mutex<Inner>,
    callbacks: Callbacks,
}

impl Breaker {
    pub fn new(name: String, threshold: u32, reset_timeout: Duration, callbacks: Callbacks) -> Self {
        Self {
            name,
            threshold: threshold.max(1),
            reset_timeout,
            inner: Mutex::new(Inner {
                state: State::Closed,
                failures: 0,
                opened_at: None,
            }),
            callbacks,
        }
    }

    pub fn state(&self) -> State {
        self.inner.lock().state
    }

    /// Returns false while open; after the reset timeout lets one trial call through.
    pub fn allow(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            State::Closed | State::HalfOpen => true,
            State::Open => {
                let expired = inner
                    .opened_at
                    .map(|at| at.elapsed() >= self.reset_timeout)
                    .unwrap_or(true);
                if expired {
                    inner.state = State::HalfOpen;
                }
                expired
            }
        }
    }

    pub fn on_success(&self) {
        let closed = {
            let mut inner = self.inner.lock();
            inner.failures = 0;
            inner.opened_at = None;
            let was = inner.state;
            inner.state = State::Closed;
            was != State::Closed
        };
        if closed {
            if let Some(cb) = &self.callbacks.on_close {
                cb(&self.name);
            }
        }
    }

    pub fn on_failure(&self) {
        let opened = {
            let mut inner = self.inner.lock();
            inner.failures = inner.failures.saturating_add(1);
            let trip = inner.state == State::HalfOpen
                || (inner.state == State::Closed && inner.failures >= self.threshold);
            if trip {
                inner.state = State::Open;
                inner.opened_at = Some(Instant::now());
            }
            trip
        };
        if opened {
            if let Some(cb) = &self.callbacks.on_open {
                cb(&self.name);
            }
        }
    }
}
