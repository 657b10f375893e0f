//! Service registry/discovery capability and the in-process provider.

pub mod api;
pub mod error;
pub mod memory;


pub use api::Registry;
pub use error::RegistryError;
pub use memory::MemoryRegistry;
