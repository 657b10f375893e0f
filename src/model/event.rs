// Membership change events delivered by a watch stream.

use std::fmt;

use super::endpoint::ServiceEndpoint;

/// Kind of membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Added,
    Deleted,
    Modified,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Added => "added",
            EventKind::Deleted => "deleted",
            EventKind::Modified => "modified",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One membership change for a single endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub service: ServiceEndpoint,
}

impl Event {
    pub fn added(service: ServiceEndpoint) -> Self {
        Self {
            kind: EventKind::Added,
            service,
        }
    }

    pub fn deleted(service: ServiceEndpoint) -> Self {
        Self {
            kind: EventKind::Deleted,
            service,
        }
    }

    pub fn modified(service: ServiceEndpoint) -> Self {
        Self {
            kind: EventKind::Modified,
            service,
        }
    }
}
