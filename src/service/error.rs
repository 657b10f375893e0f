// Error definitions for managed services.

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("service {name}: cannot {action} while {phase}")]
    InvalidTransition {
        name: String,
        action: &'static str,
        phase: &'static str,
    },
    #[error("service {name}: {reason}")]
    Failed { name: String, reason: String },
}

impl ServiceError {
    pub fn failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
