//! Structured logging and metrics setup.

pub mod metrics;

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, ConfigTrait};

const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("logger already initialized: {0}")]
    Logger(#[from] tracing_subscriber::util::TryInitError),
    #[error("invalid metrics listen address {addr}: {source}")]
    InvalidListen {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("metrics exporter failed: {0}")]
    Exporter(#[from] metrics_exporter_prometheus::BuildError),
}

/// Handle to the process-wide telemetry. Released last during shutdown.
pub struct Telemetry {
    metrics_addr: Option<SocketAddr>,
}

impl Telemetry {
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_addr
    }

    /// Emits the final log line. Nothing is logged by the core after this.
    pub fn shutdown(self) {
        info!(component = "telemetry", event = "released", "telemetry released");
    }
}

/// Configures structured logging and the optional Prometheus exporter.
/// The caller decides whether a failure here is fatal.
pub fn init(cfg: &Config) -> Result<Telemetry, TelemetryError> {
    let log_level = cfg
        .logs()
        .and_then(|logs| logs.level.as_deref())
        .unwrap_or(DEFAULT_LOG_LEVEL);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if cfg.is_prod() {
        // Production: JSON format
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()?;
    } else {
        // Development: Pretty console format
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .try_init()?;
    }

    let metrics_addr = match cfg.metrics().filter(|m| m.enabled) {
        Some(m) => {
            let raw = m.listen.as_deref().unwrap_or("0.0.0.0:9464");
            let addr: SocketAddr = raw.parse().map_err(|source| TelemetryError::InvalidListen {
                addr: raw.to_string(),
                source,
            })?;
            PrometheusBuilder::new().with_http_listener(addr).install()?;
            info!(
                component = "telemetry",
                event = "metrics_exporter_started",
                addr = %addr,
                "prometheus exporter listening"
            );
            Some(addr)
        }
        None => None,
    };

    Ok(Telemetry { metrics_addr })
}
