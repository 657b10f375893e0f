#[cfg(test)]
mod tests;

pub mod config;
pub mod model;
pub mod orchestrator;
pub mod registry;
pub mod resilience;
pub mod service;
pub mod shutdown;
pub mod supervisor;
pub mod telemetry;
pub mod watch;
