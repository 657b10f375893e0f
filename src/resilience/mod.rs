//! Resilience provider: retry policy, rate limit and circuit breaker.

pub mod breaker;
pub mod error;
pub mod resilience;


pub use breaker::{Callbacks, State as BreakerState};
pub use error::ResilienceError;
pub use resilience::Resilience;
