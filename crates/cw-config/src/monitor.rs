use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use cw_reconcile::{DeviceFamily, ReconcilePolicy};
use serde::Deserialize;
use serde_json::Value;

/// Typed view of the merged configuration tree.
///
/// Every section has defaults, so an empty document is a valid (if idle)
/// configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub cycle: CycleConfig,
    pub logging: LoggingConfig,
    pub state: StateConfig,
    pub alerting: AlertingConfig,
    pub reconcile: ReconcilePolicy,
    pub families: BTreeMap<DeviceFamily, FamilyConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    pub interval_secs: u64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub dir: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("state"),
        }
    }
}

/// Env var NAMES holding alerting secrets. Never the values.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct KeysEnv {
    pub service_key: String,
    pub api_key: String,
}

impl Default for KeysEnv {
    fn default() -> Self {
        Self {
            service_key: "CW_PAGERDUTY_SERVICE_KEY".to_string(),
            api_key: "CW_PAGERDUTY_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AlertingConfig {
    pub events_base_url: String,
    pub timeout_ms: u64,
    pub keys_env: KeysEnv,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            events_base_url: "https://events.pagerduty.com".to_string(),
            timeout_ms: 10_000,
            keys_env: KeysEnv::default(),
        }
    }
}

impl AlertingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FamilyConfig {
    pub enabled: bool,
    pub timeout_ms: u64,
    pub devices: Vec<DeviceConfig>,
}

impl Default for FamilyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 5_000,
            devices: Vec::new(),
        }
    }
}

impl FamilyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// One appliance. `channels` are channel ids, or service titles for Envivio.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceConfig {
    pub address: String,
    #[serde(default)]
    pub channels: Vec<String>,
}

impl MonitorConfig {
    pub fn from_json(config_json: &Value) -> Result<Self> {
        let cfg: MonitorConfig =
            serde_json::from_value(config_json.clone()).context("CONFIG_INVALID: typed decode failed")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Enabled families in stable order.
    pub fn enabled_families(&self) -> impl Iterator<Item = (DeviceFamily, &FamilyConfig)> {
        self.families
            .iter()
            .filter(|(_, fc)| fc.enabled)
            .map(|(f, fc)| (*f, fc))
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.cycle.interval_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.cycle.interval_secs == 0 {
            bail!("CONFIG_INVALID: cycle.interval_secs must be > 0");
        }
        if self.alerting.timeout_ms == 0 {
            bail!("CONFIG_INVALID: alerting.timeout_ms must be > 0");
        }
        for (family, fc) in &self.families {
            if fc.timeout_ms == 0 {
                bail!("CONFIG_INVALID: families.{family}.timeout_ms must be > 0");
            }
            let mut seen = std::collections::BTreeSet::new();
            for d in &fc.devices {
                if d.address.trim().is_empty() {
                    bail!("CONFIG_INVALID: families.{family} has a device with an empty address");
                }
                if !seen.insert(d.address.as_str()) {
                    bail!(
                        "CONFIG_INVALID: families.{family} lists device '{}' twice",
                        d.address
                    );
                }
            }
        }
        Ok(())
    }
}
