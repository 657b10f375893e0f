// Discovered service descriptor.

use std::fmt;

/// Name/address/namespace tuple describing a discovered service.
///
/// Produced by the registry provider per event and never mutated afterwards;
/// the orchestrator only clones it into its own bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceEndpoint {
    pub name: String,
    pub address: String,
    pub namespace: String,
}

impl ServiceEndpoint {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            namespace: namespace.into(),
        }
    }

    /// Returns a copy pointing at another address.
    pub fn with_address(&self, address: impl Into<String>) -> Self {
        Self {
            name: self.name.clone(),
            address: address.into(),
            namespace: self.namespace.clone(),
        }
    }
}

impl fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.namespace, self.name, self.address)
    }
}
