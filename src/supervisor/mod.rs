//! Startup/shutdown sequencing for the node agent.

pub mod supervisor;

pub use supervisor::{breaker_callbacks, ShutdownReport, Supervisor};
