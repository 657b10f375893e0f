// Error definitions for the resilience provider.

#[derive(Debug, thiserror::Error)]
pub enum ResilienceError {
    #[error("resilience {name}: circuit is open")]
    CircuitOpen { name: String },
    #[error("resilience {name}: already shut down")]
    ShutDown { name: String },
    #[error("{op}: gave up after {attempts} attempt(s): {source}")]
    Exhausted {
        op: String,
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },
}
