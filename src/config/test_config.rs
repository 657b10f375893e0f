use super::{Breaker, Config, CoreBox, Logs, Resilience, Shutdown};
use std::time::Duration;

/// Creates a new test configuration.
pub fn new_test_config() -> Config {
    Config {
        core: CoreBox {
            env: super::TEST.to_string(),
            logs: Some(Logs {
                level: Some("debug".to_string()),
            }),
            namespace: "default".to_string(),
            discover_namespace: None,
            shutdown: Some(Shutdown {
                timeout: Some(Duration::from_secs(5)),
            }),
            resilience: Some(Resilience {
                max_retries: Some(0),
                backoff: Some(Duration::from_millis(1)),
                max_backoff: Some(Duration::from_millis(5)),
                rate_per_sec: None,
                breaker: Some(Breaker {
                    failure_threshold: Some(5),
                    reset_timeout: Some(Duration::from_millis(50)),
                }),
            }),
            metrics: None,
            services: Vec::new(),
        },
    }
}
