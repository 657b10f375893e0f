// Main entrypoint for the core service node agent.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use core_service::config::{Config, ConfigTrait};
use core_service::registry::MemoryRegistry;
use core_service::shutdown::GracefulShutdown;
use core_service::supervisor::Supervisor;
use core_service::telemetry;

const CONFIG_PATH: &str = "cfg/core.cfg.yaml";
const CONFIG_PATH_LOCAL: &str = "cfg/core.cfg.local.yaml";

/// Core service - keeps managed services in sync with the service registry
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Custom config file path
    #[arg(short, long, value_name = "FILE")]
    cfg: Option<PathBuf>,
}

/// Loads the configuration struct from YAML file.
/// Tries local config first, then falls back to default config.
fn load_cfg(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    if let Some(custom_path) = path {
        let cfg = Config::load(&custom_path)
            .with_context(|| format!("failed to load custom config from {:?}", custom_path))?;
        return Ok((cfg, custom_path));
    }

    // Try local config first
    match Config::load(CONFIG_PATH_LOCAL) {
        Ok(cfg) => Ok((cfg, PathBuf::from(CONFIG_PATH_LOCAL))),
        Err(_) => {
            // Fall back to default config
            let cfg = Config::load(CONFIG_PATH)
                .with_context(|| format!("failed to load config from {}", CONFIG_PATH))?;
            Ok((cfg, PathBuf::from(CONFIG_PATH)))
        }
    }
}

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")?
        .block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<()> {
    let (cfg, cfg_path) = load_cfg(args.cfg)?;

    // Logger and metrics come first so the rest of startup is observable.
    let telemetry = telemetry::init(&cfg).context("failed to initialize telemetry")?;
    info!(
        component = "config",
        event = "load_success",
        path = ?cfg_path,
        namespace = %cfg.namespace(),
        metrics_addr = ?telemetry.metrics_addr(),
        "config loaded"
    );

    let shutdown_token = CancellationToken::new();
    let graceful_shutdown = GracefulShutdown::new(shutdown_token.clone(), cfg.shutdown_timeout());
    let signals = graceful_shutdown.listen();

    let registry = MemoryRegistry::seeded(cfg.seed_endpoints())
        .await
        .context("failed to build service registry")?;
    let supervisor = Supervisor::build(cfg, graceful_shutdown.clone(), Arc::new(registry));

    let started = supervisor.start().await;
    if let Err(e) = &started {
        error!(
            component = "main",
            event = "start_failed",
            error = %format!("{e:#}"),
            "failed to start core service"
        );
    } else {
        supervisor.wait().await;
    }

    let report = supervisor.shutdown().await;
    info!(
        component = "main",
        stop_failures = report.stop_failures,
        registry_stopped = report.registry_stopped,
        resilience_released = report.resilience_released,
        "shutdown finished"
    );

    if let Err(e) = signals.await {
        error!(component = "main", error = %e, "signal listener failed");
    }

    // Telemetry goes last so the whole shutdown stays observable.
    telemetry.shutdown();
    started
}
