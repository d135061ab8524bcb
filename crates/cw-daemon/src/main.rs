//! cw-daemon entry point.
//!
//! Loads layered config, resolves secrets, then checks every enabled family
//! on a fixed interval until ctrl-c.

use anyhow::{Context, Result};
use clap::Parser;
use cw_config::{load_layered_yaml, report_unused_keys, resolve_secrets, UnusedKeyPolicy};
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{reload, EnvFilter, Registry};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

#[derive(Parser)]
#[command(name = "cw-daemon")]
#[command(about = "Broadcast channel state watcher", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (base -> site -> local ...)
    #[arg(long = "config", required = true)]
    config_paths: Vec<String>,

    /// Run a single cycle and exit
    #[arg(long, default_value_t = false)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();
    let filter = init_tracing();

    if let Err(e) = run(cli, &filter).await {
        error!(error = %format!("{e:#}"), "cw-daemon stopped");
        return Err(e);
    }
    Ok(())
}

async fn run(cli: Cli, filter: &FilterHandle) -> Result<()> {
    let loaded = load_layered_yaml(&cli.config_paths[..]).context("load config")?;
    let cfg = loaded.monitor()?;

    apply_configured_level(filter, &cfg.logging.level)?;
    info!(config_hash = %loaded.config_hash, "config loaded");

    let unused = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for ptr in &unused.unused_leaf_pointers {
        warn!(pointer = %ptr, "config key not consumed");
    }

    let secrets = resolve_secrets(&cfg)?;
    let runs = cw_daemon::build_runs(&cfg, &secrets)?;
    info!(families = runs.len(), interval_secs = cfg.cycle.interval_secs, "cw-daemon starting");

    if cli.once {
        cw_daemon::run_cycle(&runs).await;
        return Ok(());
    }

    let mut ticker = tokio::time::interval(cfg.interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                cw_daemon::run_cycle(&runs).await;
            }
            res = tokio::signal::ctrl_c() => {
                res.context("listen for ctrl-c")?;
                info!("shutdown requested");
                break;
            }
        }
    }
    Ok(())
}

/// Installed before config is read so config errors are logged too.
/// Starts from `RUST_LOG`, else `info`.
fn init_tracing() -> FilterHandle {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let (filter, handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
    handle
}

/// `RUST_LOG` wins over the configured level.
fn apply_configured_level(handle: &FilterHandle, level: &str) -> Result<()> {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return Ok(());
    }
    let filter = cw_daemon::log_filter(level)?;
    handle
        .reload(filter)
        .context("apply configured log level")
}
