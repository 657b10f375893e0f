//! Managed service capability and the default endpoint-backed implementation.

pub mod api;
pub mod endpoint_service;
pub mod error;


pub use api::{ManagedService, UpdateOutcome};
pub use endpoint_service::EndpointService;
pub use error::ServiceError;
