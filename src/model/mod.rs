//! Data types shared between the registry provider and the orchestrator.

pub mod endpoint;
pub mod event;

pub use endpoint::ServiceEndpoint;
pub use event::{Event, EventKind};
