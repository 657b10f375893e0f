// Configuration loading and management.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::model::ServiceEndpoint;

mod test_config;
pub use test_config::new_test_config;


pub const PROD: &str = "prod";
pub const TEST: &str = "test";

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Core {
    #[serde(rename = "core")]
    pub core: CoreBox,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoreBox {
    pub env: String,
    pub logs: Option<Logs>,
    /// Namespace the watch stream is opened for.
    pub namespace: String,
    /// Namespace of the startup discovery snapshot; defaults to `namespace`.
    pub discover_namespace: Option<String>,
    pub shutdown: Option<Shutdown>,
    pub resilience: Option<Resilience>,
    pub metrics: Option<Metrics>,
    #[serde(default)]
    pub services: Vec<SeedService>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Logs {
    pub level: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Shutdown {
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Resilience {
    pub max_retries: Option<u32>,
    #[serde(default, with = "humantime_serde")]
    pub backoff: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pub max_backoff: Option<Duration>,
    pub rate_per_sec: Option<u32>,
    pub breaker: Option<Breaker>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Breaker {
    pub failure_threshold: Option<u32>,
    #[serde(default, with = "humantime_serde")]
    pub reset_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Metrics {
    pub enabled: bool,
    pub listen: Option<String>,
}

/// Endpoint known before watching begins.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeedService {
    pub name: String,
    pub address: String,
    pub namespace: Option<String>,
}

// Config trait
pub trait ConfigTrait {
    fn logs(&self) -> Option<&Logs>;
    fn is_prod(&self) -> bool;
    fn namespace(&self) -> &str;
    fn discover_namespace(&self) -> &str;
    fn shutdown_timeout(&self) -> Duration;
    fn resilience(&self) -> Resilience;
    fn metrics(&self) -> Option<&Metrics>;
    fn seed_endpoints(&self) -> Vec<ServiceEndpoint>;
}

// Config type alias for convenience
pub type Config = Core;

impl ConfigTrait for Config {
    fn logs(&self) -> Option<&Logs> {
        self.core.logs.as_ref()
    }

    fn is_prod(&self) -> bool {
        self.core.env == PROD
    }

    fn namespace(&self) -> &str {
        &self.core.namespace
    }

    fn discover_namespace(&self) -> &str {
        self.core
            .discover_namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .unwrap_or(&self.core.namespace)
    }

    fn shutdown_timeout(&self) -> Duration {
        self.core
            .shutdown
            .as_ref()
            .and_then(|s| s.timeout)
            .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT)
    }

    fn resilience(&self) -> Resilience {
        self.core.resilience.clone().unwrap_or_default()
    }

    fn metrics(&self) -> Option<&Metrics> {
        self.core.metrics.as_ref()
    }

    fn seed_endpoints(&self) -> Vec<ServiceEndpoint> {
        self.core
            .services
            .iter()
            .map(|s| {
                let ns = s.namespace.as_deref().unwrap_or(&self.core.namespace);
                ServiceEndpoint::new(s.name.clone(), s.address.clone(), ns)
            })
            .collect()
    }
}

impl Config {
    /// Loads configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        Self::parse(&data).with_context(|| format!("invalid config file {:?}", path))
    }

    /// Parses and validates configuration from a YAML document.
    pub fn parse(data: &str) -> Result<Self> {
        let cfg: Config = serde_yaml::from_str(data).context("failed to parse YAML config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.core.namespace.trim().is_empty() {
            bail!("core.namespace must not be empty");
        }

        let mut seen = std::collections::HashSet::new();
        for srv in &self.core.services {
            if srv.name.trim().is_empty() {
                bail!("core.services: service name must not be empty");
            }
            if !seen.insert(srv.name.as_str()) {
                bail!("core.services: duplicate service {}", srv.name);
            }
        }

        if let Some(rate) = self.core.resilience.as_ref().and_then(|r| r.rate_per_sec) {
            if rate == 0 {
                bail!("core.resilience.rate_per_sec must be positive");
            }
        }

        Ok(())
    }
}
