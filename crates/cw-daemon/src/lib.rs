//! Wiring from a validated [`MonitorConfig`] to runnable reconciliation runs.
//!
//! `main.rs` owns process concerns (args, tracing, signals); everything here
//! is callable from tests.

use std::sync::Arc;

use anyhow::{Context, Result};
use cw_alert::{AlertDispatcher, PagerDutyClient, PagerDutyConfig};
use cw_config::{MonitorConfig, ResolvedSecrets};
use cw_runtime::{FamilyLocks, ReconciliationRun, RunReport, RunStatus};
use cw_source::{DeviceTarget, HttpChannelSource};
use cw_state::JsonFileStateStore;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Filter for the configured `logging.level`.
pub fn log_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level).with_context(|| format!("CONFIG_INVALID: logging.level '{level}'"))
}

/// One run per enabled family, sharing the alerting client, the state
/// directory and the family locks.
pub fn build_runs(cfg: &MonitorConfig, secrets: &ResolvedSecrets) -> Result<Vec<ReconciliationRun>> {
    let pagerduty = PagerDutyClient::new(PagerDutyConfig {
        events_base_url: cfg.alerting.events_base_url.clone(),
        service_key: secrets.pagerduty_service_key.clone(),
        api_key: secrets.pagerduty_api_key.clone(),
        timeout: cfg.alerting.timeout(),
    })
    .context("build pagerduty client")?;
    let dispatcher = AlertDispatcher::new(Arc::new(pagerduty));
    let store = Arc::new(JsonFileStateStore::new(cfg.state.dir.clone()));
    let locks = Arc::new(FamilyLocks::new());

    let mut runs = Vec::new();
    for (family, fc) in cfg.enabled_families() {
        if fc.devices.is_empty() {
            warn!(%family, "family enabled without devices; skipped");
            continue;
        }
        let targets = fc
            .devices
            .iter()
            .map(|d| DeviceTarget::new(d.address.clone(), d.channels.clone()))
            .collect();
        let source = HttpChannelSource::new(family, targets, fc.timeout())
            .with_context(|| format!("build source for {family}"))?;

        runs.push(
            ReconciliationRun::new(
                Arc::new(source),
                store.clone(),
                dispatcher.clone(),
                cfg.reconcile,
            )
            .with_locks(locks.clone()),
        );
    }
    Ok(runs)
}

/// Execute every run once, in order, and log each outcome.
pub async fn run_cycle(runs: &[ReconciliationRun]) -> Vec<RunReport> {
    let mut reports = Vec::with_capacity(runs.len());
    for run in runs {
        let report = run.execute().await;
        match report.status {
            RunStatus::Ok => info!(run_id = %report.run_id, status = report.status.as_str(), "{}", report.message),
            RunStatus::Degraded => warn!(run_id = %report.run_id, status = report.status.as_str(), "{}", report.message),
            RunStatus::Failed => error!(run_id = %report.run_id, status = report.status.as_str(), "{}", report.message),
        }
        reports.push(report);
    }
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn configured_level_becomes_filter() {
        let f = log_filter("debug").unwrap();
        assert_eq!(f.max_level_hint(), Some(LevelFilter::DEBUG));

        let f = log_filter("warn,cw_source=trace").unwrap();
        assert_eq!(f.max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn bad_configured_level_is_a_config_error() {
        let err = log_filter("cw_daemon=loud").unwrap_err();
        assert!(format!("{err:#}").contains("CONFIG_INVALID: logging.level"));
    }
}
